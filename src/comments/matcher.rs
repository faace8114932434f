//! Row matching
//!
//! Answers the two questions a row renderer asks on every paint: does this
//! row carry a comment, and which raw ranges of it should be highlighted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{Comment, CommentId, CommentState};
use crate::resolve::escape::char_len;

/// The part of one row owned by one comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightDescriptor {
    pub comment_id: CommentId,
    /// Row position
    pub position: usize,
    /// Char offset into the raw row
    pub start: usize,
    /// Char offset into the raw row, exclusive
    pub end: usize,
    pub state: CommentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl HighlightDescriptor {
    /// Describe the slice of `row_raw` that `comment` covers at `position`
    ///
    /// Interior rows are covered whole. Offsets are clamped to the row.
    pub fn for_row(comment: &Comment, position: usize, row_raw: &str) -> Option<Self> {
        let span = &comment.selection;
        if !span.contains_position(position) {
            return None;
        }

        let row_len = char_len(row_raw);
        let start = if position == span.start.position {
            span.start.offset.min(row_len)
        } else {
            0
        };
        let end = if position == span.end.position {
            span.end.offset.min(row_len)
        } else {
            row_len
        };

        Some(Self {
            comment_id: comment.id,
            position,
            start,
            end: end.max(start),
            state: comment.state,
            color: comment.color.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Read-only view over stored comments for row rendering
#[derive(Debug, Clone, Copy)]
pub struct RowMatcher<'a> {
    comments: &'a HashMap<CommentId, Comment>,
}

impl<'a> RowMatcher<'a> {
    pub fn new(comments: &'a HashMap<CommentId, Comment>) -> Self {
        Self { comments }
    }

    /// Whether any comment covers `position`, boundaries included
    pub fn is_row_commented(&self, position: usize) -> bool {
        self.comments
            .values()
            .any(|comment| comment.selection.contains_position(position))
    }

    /// Comments covering `position`
    pub fn relevant(&self, position: usize) -> impl Iterator<Item = &'a Comment> + 'a {
        self.comments
            .values()
            .filter(move |comment| comment.selection.contains_position(position))
    }

    /// Highlight ranges for one row, ordered by start offset
    pub fn modifiers(&self, position: usize, row_raw: &str) -> Vec<HighlightDescriptor> {
        let mut descriptors: Vec<HighlightDescriptor> = self
            .relevant(position)
            .filter_map(|comment| HighlightDescriptor::for_row(comment, position, row_raw))
            .collect();
        descriptors.sort_by_key(|d| (d.start, d.end, d.comment_id));
        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::types::{LogicalPoint, SelectionSpan};

    fn comment(start: (usize, usize), end: (usize, usize)) -> Comment {
        Comment::pending(SelectionSpan::new(
            LogicalPoint::new(start.0, start.1),
            LogicalPoint::new(end.0, end.1),
            "",
        ))
    }

    fn map(comments: Vec<Comment>) -> HashMap<CommentId, Comment> {
        comments.into_iter().map(|c| (c.id, c)).collect()
    }

    #[test]
    fn test_row_commented_inclusive_bounds() {
        let comments = map(vec![comment((10, 7), (12, 3))]);
        let matcher = RowMatcher::new(&comments);

        assert!(!matcher.is_row_commented(9));
        assert!(matcher.is_row_commented(10));
        assert!(matcher.is_row_commented(11));
        assert!(matcher.is_row_commented(12));
        assert!(!matcher.is_row_commented(13));
    }

    #[test]
    fn test_empty_store_has_no_comments() {
        let comments = HashMap::new();
        let matcher = RowMatcher::new(&comments);
        assert!(!matcher.is_row_commented(0));
        assert!(matcher.modifiers(0, "row").is_empty());
    }

    #[test]
    fn test_multi_row_descriptors() {
        let c = comment((10, 7), (12, 3));
        let comments = map(vec![c.clone()]);
        let matcher = RowMatcher::new(&comments);

        let first = matcher.modifiers(10, "0123456789abc");
        assert_eq!((first[0].start, first[0].end), (7, 13));

        let middle = matcher.modifiers(11, "whole row");
        assert_eq!((middle[0].start, middle[0].end), (0, 9));

        let last = matcher.modifiers(12, "abcdef");
        assert_eq!((last[0].start, last[0].end), (0, 3));
        assert_eq!(last[0].comment_id, c.id);
        assert_eq!(last[0].state, CommentState::Pending);
    }

    #[test]
    fn test_single_row_descriptor_is_clamped() {
        let comments = map(vec![comment((4, 2), (4, 40))]);
        let matcher = RowMatcher::new(&comments);

        let mods = matcher.modifiers(4, "short");
        assert_eq!((mods[0].start, mods[0].end), (2, 5));
        assert!(!mods[0].is_empty());
    }

    #[test]
    fn test_descriptors_sorted_by_start() {
        let comments = map(vec![comment((1, 8), (1, 10)), comment((1, 0), (1, 2))]);
        let matcher = RowMatcher::new(&comments);

        let starts: Vec<usize> = matcher
            .modifiers(1, "abcdefghijkl")
            .iter()
            .map(|d| d.start)
            .collect();
        assert_eq!(starts, vec![0, 8]);
    }
}
