//! Comment types anchored to logical document coordinates
//!
//! Coordinates are `(row position, character offset)` pairs. The offset
//! indexes the row's *raw* text, escape bytes included, so a comment stays
//! put no matter how the row is re-rendered or virtualized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique comment identifier (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(Uuid);

impl CommentId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// A point in the underlying (not virtualized) document
///
/// Ordering is lexicographic by `(position, offset)`; the derive relies on
/// the field order below.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LogicalPoint {
    /// Row index
    pub position: usize,
    /// Character index into the row's raw text
    pub offset: usize,
}

impl LogicalPoint {
    pub fn new(position: usize, offset: usize) -> Self {
        Self { position, offset }
    }
}

/// A selected range of the document plus the text the user saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSpan {
    pub start: LogicalPoint,
    pub end: LogicalPoint,
    /// Rendered selected text, rows separated by `\n`
    pub text: String,
}

impl SelectionSpan {
    /// Create a span, swapping the endpoints if they arrive reversed
    pub fn new(start: LogicalPoint, end: LogicalPoint, text: impl Into<String>) -> Self {
        let mut span = Self {
            start,
            end,
            text: text.into(),
        };
        span.normalize();
        span
    }

    /// Restore `start <= end`
    pub fn normalize(&mut self) {
        if self.start > self.end {
            std::mem::swap(&mut self.start, &mut self.end);
        }
    }

    /// Whether both endpoints sit on the same row
    pub fn is_single_row(&self) -> bool {
        self.start.position == self.end.position
    }

    /// Whether `position` lies in `[start.position, end.position]`
    pub fn contains_position(&self, position: usize) -> bool {
        self.start.position <= position && position <= self.end.position
    }

    /// Number of rows touched by the span
    pub fn row_count(&self) -> usize {
        self.end.position - self.start.position + 1
    }

    /// Stretch this span to also cover `other`
    ///
    /// The text is left as is; it still describes the first selection made
    /// for this comment.
    pub fn extend_to(&mut self, other: &SelectionSpan) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

/// Comment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentState {
    /// Waiting for the edit interaction to finish
    Pending,
    /// Text accepted
    Done,
}

/// A comment attached to a selection of the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier
    pub id: CommentId,
    pub state: CommentState,
    /// Comment body, empty while a new comment is pending
    #[serde(rename = "comment")]
    pub text: String,
    /// Highlight color (CSS color value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub selection: SelectionSpan,
    /// Creation timestamp
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Create a new pending comment over `selection`
    pub fn pending(selection: SelectionSpan) -> Self {
        let now = Utc::now();
        Self {
            id: CommentId::new(),
            state: CommentState::Pending,
            text: String::new(),
            color: None,
            selection,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the color
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.state == CommentState::Pending
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Pre-merge copy of a comment, kept so a cancelled merge can be undone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackSnapshot(Comment);

impl RollbackSnapshot {
    pub fn capture(comment: &Comment) -> Self {
        Self(comment.clone())
    }

    pub fn comment(&self) -> &Comment {
        &self.0
    }

    pub fn id(&self) -> CommentId {
        self.0.id
    }

    pub fn into_comment(self) -> Comment {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(position: usize, offset: usize) -> LogicalPoint {
        LogicalPoint::new(position, offset)
    }

    #[test]
    fn test_point_ordering_is_lexicographic() {
        assert!(point(1, 50) < point(2, 0));
        assert!(point(2, 3) < point(2, 4));
        assert_eq!(point(4, 4).cmp(&point(4, 4)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_span_normalizes_reversed_endpoints() {
        let span = SelectionSpan::new(point(12, 3), point(10, 7), "abc");
        assert_eq!(span.start, point(10, 7));
        assert_eq!(span.end, point(12, 3));
        assert!(!span.is_single_row());
        assert_eq!(span.row_count(), 3);
    }

    #[test]
    fn test_extend_uses_point_order() {
        let mut span = SelectionSpan::new(point(10, 8), point(12, 2), "a");
        span.extend_to(&SelectionSpan::new(point(10, 4), point(11, 30), "b"));

        assert_eq!(span.start, point(10, 4));
        assert_eq!(span.end, point(12, 2));
        assert_eq!(span.text, "a");
    }

    #[test]
    fn test_pending_comment() {
        let span = SelectionSpan::new(point(3, 0), point(3, 4), "WARN");
        let comment = Comment::pending(span).with_color("#ff0000");

        assert!(comment.is_pending());
        assert!(comment.text.is_empty());
        assert_eq!(comment.color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_serialization() {
        let span = SelectionSpan::new(point(3, 0), point(3, 4), "WARN");
        let comment = Comment::pending(span);

        let json = serde_json::to_string(&comment).unwrap();
        assert!(json.contains("\"state\":\"pending\""));
        assert!(json.contains(&format!("\"id\":\"{}\"", comment.id)));
        assert!(!json.contains("color"));

        let parsed: Comment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, comment);
    }
}
