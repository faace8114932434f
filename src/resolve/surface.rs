//! Rendering surface contract
//!
//! The surface owns the virtualized row list and the user's live selection.
//! Resolution needs three things from it: the raw text of a row, the
//! rendered text between the start of a row and a caret, and a way to
//! collapse and later restore the live selection.

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};

/// Which end of the selection a collapse keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionEdge {
    Start,
    End,
}

/// Selection as reported by the scroll box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedSelection {
    /// Row position where the user started dragging
    pub anchor_position: usize,
    /// Row position where the user stopped
    pub focus_position: usize,
    /// Rendered selected text, rows separated by line breaks
    pub text: String,
}

impl ReportedSelection {
    pub fn new(anchor_position: usize, focus_position: usize, text: impl Into<String>) -> Self {
        Self {
            anchor_position,
            focus_position,
            text: text.into(),
        }
    }

    pub fn is_single_row(&self) -> bool {
        self.anchor_position == self.focus_position
    }

    pub fn start_position(&self) -> usize {
        self.anchor_position.min(self.focus_position)
    }

    pub fn end_position(&self) -> usize {
        self.anchor_position.max(self.focus_position)
    }
}

/// What the resolver needs from the host's rendering layer
pub trait RenderingSurface {
    /// Opaque copy of the live selection
    type Snapshot;

    /// Raw text (escape bytes included) of the row at `position`
    fn row_text(&self, position: usize) -> Option<&str>;

    /// The current selection, if any
    fn reported_selection(&self) -> Option<ReportedSelection>;

    /// Save the live selection, start before end
    fn remember(&self) -> Option<Self::Snapshot>;

    /// Put a remembered selection back
    fn restore(&mut self, snapshot: &Self::Snapshot);

    /// Collapse the live selection onto one of its edges
    fn collapse(&mut self, edge: SelectionEdge) -> Result<()>;

    /// Rendered text from the enclosing row's start up to the caret
    ///
    /// Consumes the live selection. The search for the enclosing row must
    /// give up after `max_depth` ancestors.
    fn text_before_caret(&mut self, max_depth: usize) -> Result<String>;
}

/// Parent links of a rendering tree
pub trait RowTree {
    type Node: Copy;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether `node` is the root element of one log row
    fn is_row_boundary(&self, node: Self::Node) -> bool;
}

/// Walk up from `node` to the nearest row boundary
///
/// Iterative and bounded: at most `max_depth` parent hops are taken, so a
/// malformed (or cyclic) tree ends in `RowBoundaryNotFound` instead of
/// running away.
pub fn find_row_boundary<T: RowTree + ?Sized>(
    tree: &T,
    node: T::Node,
    max_depth: usize,
) -> Result<T::Node> {
    let mut current = node;
    for _ in 0..=max_depth {
        if tree.is_row_boundary(current) {
            return Ok(current);
        }
        match tree.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Err(AnnotationError::RowBoundaryNotFound { depth: max_depth })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parent table; node 1 is the row, node 3 loops back to itself
    struct Table(Vec<Option<usize>>);

    impl RowTree for Table {
        type Node = usize;

        fn parent(&self, node: usize) -> Option<usize> {
            self.0.get(node).copied().flatten()
        }

        fn is_row_boundary(&self, node: usize) -> bool {
            node == 1
        }
    }

    fn table() -> Table {
        Table(vec![None, Some(0), Some(1), Some(3), Some(2), None])
    }

    #[test]
    fn test_finds_row_ancestor() {
        assert_eq!(find_row_boundary(&table(), 4, 8).unwrap(), 1);
        assert_eq!(find_row_boundary(&table(), 1, 0).unwrap(), 1);
    }

    #[test]
    fn test_depth_bound() {
        let err = find_row_boundary(&table(), 4, 1).unwrap_err();
        assert!(matches!(err, AnnotationError::RowBoundaryNotFound { depth: 1 }));
    }

    #[test]
    fn test_no_ancestor() {
        assert!(find_row_boundary(&table(), 5, 8).is_err());
        assert!(find_row_boundary(&table(), 0, 8).is_err());
    }

    #[test]
    fn test_cycle_terminates() {
        assert!(matches!(
            find_row_boundary(&table(), 3, 16),
            Err(AnnotationError::RowBoundaryNotFound { depth: 16 })
        ));
    }

    #[test]
    fn test_reported_selection_bounds() {
        let sel = ReportedSelection::new(12, 10, "xyz\n\nabc");
        assert!(!sel.is_single_row());
        assert_eq!(sel.start_position(), 10);
        assert_eq!(sel.end_position(), 12);
    }
}
