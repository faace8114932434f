//! Overlap detection and merging
//!
//! A new selection is compared against every stored comment. The crossing
//! rule is deliberately asymmetric: spans confined to the same single row
//! compare offsets, everything else compares row ranges only. A selection
//! that starts on row 10 after the end of a multi-row comment ending on
//! row 10 is still classified as crossing.

use std::collections::HashMap;

use super::types::{Comment, CommentId, CommentState, RollbackSnapshot, SelectionSpan};

/// What `create` should do with a freshly resolved span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDecision {
    /// Nothing crosses; store a new comment
    Insert,
    /// Exactly one comment crosses; fold the span into it
    Merge(CommentId),
    /// Two or more comments cross; leave the store untouched
    Ambiguous(Vec<CommentId>),
}

/// Whether `incoming` crosses the stored span `existing`
pub fn crosses(existing: &SelectionSpan, incoming: &SelectionSpan) -> bool {
    let same_single_row = existing.is_single_row()
        && existing.start.position == incoming.start.position
        && existing.end.position == incoming.end.position;

    if same_single_row {
        return ranges_touch(
            (existing.start.offset, existing.end.offset),
            (incoming.start.offset, incoming.end.offset),
        );
    }

    ranges_touch(
        (existing.start.position, existing.end.position),
        (incoming.start.position, incoming.end.position),
    )
}

/// Inclusive range intersection: either endpoint inside, or containment
fn ranges_touch(existing: (usize, usize), incoming: (usize, usize)) -> bool {
    let inside = |value: usize| existing.0 <= value && value <= existing.1;
    inside(incoming.0)
        || inside(incoming.1)
        || (incoming.0 <= existing.0 && incoming.1 >= existing.1)
}

/// Classifies a new span against the stored comments
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlapMerger;

impl OverlapMerger {
    /// Collect every stored comment crossed by `incoming`
    ///
    /// Ids come back sorted so the result does not depend on map order.
    pub fn crossing(
        &self,
        comments: &HashMap<CommentId, Comment>,
        incoming: &SelectionSpan,
    ) -> Vec<CommentId> {
        let mut ids: Vec<CommentId> = comments
            .values()
            .filter(|comment| crosses(&comment.selection, incoming))
            .map(|comment| comment.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn decide(
        &self,
        comments: &HashMap<CommentId, Comment>,
        incoming: &SelectionSpan,
    ) -> MergeDecision {
        let mut crossing = self.crossing(comments, incoming);
        match crossing.len() {
            0 => MergeDecision::Insert,
            1 => MergeDecision::Merge(crossing.remove(0)),
            _ => MergeDecision::Ambiguous(crossing),
        }
    }

    /// Fold `incoming` into `existing`, returning the pre-merge snapshot
    ///
    /// The comment keeps its id and goes back to pending.
    pub fn merge(&self, existing: &mut Comment, incoming: &SelectionSpan) -> RollbackSnapshot {
        let snapshot = RollbackSnapshot::capture(existing);
        existing.selection.extend_to(incoming);
        existing.state = CommentState::Pending;
        existing.touch();
        snapshot
    }
}
