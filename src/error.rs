//! Error types for the comment annotation core
//!
//! Every failure here is local and recoverable. Nothing crosses the store
//! boundary as a panic; callers get one of these back synchronously.

use thiserror::Error;

use crate::comments::CommentId;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Annotation error type
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// The rendering surface reported no live selection
    #[error("No active selection")]
    SelectionUnavailable,

    /// The caret node has no enclosing row boundary
    #[error("No row boundary found within {depth} ancestors")]
    RowBoundaryNotFound { depth: usize },

    /// A multi-row selection did not split into at least two rows
    #[error("Fail to split selection into rows: got {rows}")]
    RowSplitFailure { rows: usize },

    /// Rendered text could not be located inside the raw row text
    #[error("Fail to catch {edge} of selection: {text:?}")]
    OffsetResolutionFailure { edge: ResolutionEdge, text: String },

    /// The new selection crosses two or more stored comments
    #[error("Selection crosses {} existing comments", crossing.len())]
    AmbiguousOverlap { crossing: Vec<CommentId> },

    /// The escape-tolerant matcher could not be compiled
    #[error("Invalid selection pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The session actor has stopped
    #[error("Comment session is closed")]
    SessionClosed,
}

/// Which boundary of a selection failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionEdge {
    Beginning,
    End,
}

impl std::fmt::Display for ResolutionEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionEdge::Beginning => f.write_str("beginning"),
            ResolutionEdge::End => f.write_str("end"),
        }
    }
}

impl AnnotationError {
    /// Whether the caller should offer a fresh selection rather than give up
    ///
    /// Rendering-state failures go away once the user reselects; an
    /// ambiguous overlap needs the user to remove or shrink a comment first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnnotationError::SelectionUnavailable
                | AnnotationError::RowBoundaryNotFound { .. }
                | AnnotationError::RowSplitFailure { .. }
                | AnnotationError::OffsetResolutionFailure { .. }
        )
    }
}
