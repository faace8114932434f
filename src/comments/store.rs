//! In-memory comment store
//!
//! Owns the id → comment mapping for one session and drives every lifecycle
//! transition: create (insert or merge), the edit interaction, remove and
//! update. All mutation goes through here; readers get copies.

use std::collections::HashMap;

use serde::Serialize;

use super::events::EventBus;
use super::host::{Collaborators, EditOutcome, EditRequest, EditTicket};
use super::matcher::{HighlightDescriptor, RowMatcher};
use super::merge::{MergeDecision, OverlapMerger};
use super::types::{Comment, CommentId, CommentState, RollbackSnapshot, SelectionSpan};
use crate::error::{AnnotationError, Result};
use crate::resolve::{OffsetResolver, RenderingSurface, ReportedSelection};

/// What a successful `create` did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcome {
    /// The stored comment, now pending
    pub comment: Comment,
    /// Whether the span was folded into an existing comment
    pub merged: bool,
    /// Pre-merge copy, present only when `merged`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackSnapshot>,
}

/// Comment store for one log session
#[derive(Debug)]
pub struct AnnotationStore {
    comments: HashMap<CommentId, Comment>,
    events: EventBus,
    hosts: Collaborators,
    resolver: OffsetResolver,
    merger: OverlapMerger,
    default_color: Option<String>,
}

impl AnnotationStore {
    /// Create an empty store
    pub fn new(hosts: Collaborators) -> Self {
        Self {
            comments: HashMap::new(),
            events: EventBus::new(),
            hosts,
            resolver: OffsetResolver::default(),
            merger: OverlapMerger,
            default_color: None,
        }
    }

    pub fn with_resolver(mut self, resolver: OffsetResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Color given to newly inserted comments
    pub fn with_default_color(mut self, color: Option<String>) -> Self {
        self.default_color = color;
        self
    }

    /// Subscription point for lifecycle events
    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Resolve the surface's live selection and store it as a pending comment
    pub fn create<S: RenderingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        selection: &ReportedSelection,
        start_row_raw: &str,
        end_row_raw: &str,
    ) -> Result<CreateOutcome> {
        let span = self
            .resolver
            .resolve_selection(surface, selection, start_row_raw, end_row_raw)?;
        self.create_span(span)
    }

    /// Like [`create`](Self::create), reading the selection and row text
    /// from the surface itself
    pub fn create_at_selection<S: RenderingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Result<CreateOutcome> {
        let selection = surface
            .reported_selection()
            .ok_or(AnnotationError::SelectionUnavailable)?;
        let start_row_raw = surface
            .row_text(selection.start_position())
            .ok_or(AnnotationError::SelectionUnavailable)?
            .to_string();
        let end_row_raw = surface
            .row_text(selection.end_position())
            .ok_or(AnnotationError::SelectionUnavailable)?
            .to_string();
        self.create(surface, &selection, &start_row_raw, &end_row_raw)
    }

    /// Store an already resolved span
    ///
    /// The crossing scan and the insert or merge happen in one `&mut self`
    /// call, so two creates can never interleave.
    pub fn create_span(&mut self, span: SelectionSpan) -> Result<CreateOutcome> {
        let mut span = span;
        span.normalize();

        let (comment, rollback) = match self.merger.decide(&self.comments, &span) {
            MergeDecision::Insert => {
                let mut comment = Comment::pending(span);
                comment.color = self.default_color.clone();
                tracing::info!(
                    comment_id = %comment.id,
                    start = ?comment.selection.start,
                    end = ?comment.selection.end,
                    "Created pending comment"
                );
                self.comments.insert(comment.id, comment.clone());
                (comment, None)
            }
            MergeDecision::Merge(id) => {
                let existing = self
                    .comments
                    .get_mut(&id)
                    .ok_or(AnnotationError::AmbiguousOverlap { crossing: vec![id] })?;
                let snapshot = self.merger.merge(existing, &span);
                tracing::info!(
                    comment_id = %id,
                    start = ?existing.selection.start,
                    end = ?existing.selection.end,
                    "Merged selection into existing comment"
                );
                (existing.clone(), Some(snapshot))
            }
            MergeDecision::Ambiguous(crossing) => {
                tracing::warn!(
                    crossing = crossing.len(),
                    start = ?span.start,
                    end = ?span.end,
                    "Selection crosses several comments, nothing stored"
                );
                return Err(AnnotationError::AmbiguousOverlap { crossing });
            }
        };

        let merged = rollback.is_some();
        self.events.emit_pending(&comment);
        self.open_edit(comment.clone(), !merged, rollback.clone());
        self.hosts.refresher.refresh_rows();

        Ok(CreateOutcome {
            comment,
            merged,
            rollback,
        })
    }

    // ========================================================================
    // Edit interaction
    // ========================================================================

    fn open_edit(&mut self, comment: Comment, created: bool, rollback: Option<RollbackSnapshot>) {
        let ticket = EditTicket {
            comment: comment.clone(),
            created,
            rollback,
        };
        self.hosts.dialog.present(EditRequest {
            comment,
            is_new: created,
            ticket,
        });
    }

    /// Reopen the edit interaction for a stored comment
    ///
    /// The comment goes back to pending. Without an explicit `rollback` the
    /// current entry is snapshotted, so cancelling restores it. Returns false
    /// for unknown ids.
    pub fn edit(&mut self, id: CommentId, rollback: Option<RollbackSnapshot>) -> bool {
        let Some(comment) = self.comments.get_mut(&id) else {
            tracing::debug!(comment_id = %id, "Edit requested for unknown comment");
            return false;
        };

        let rollback = rollback.unwrap_or_else(|| RollbackSnapshot::capture(comment));
        comment.state = CommentState::Pending;
        let comment = comment.clone();

        tracing::info!(comment_id = %id, "Editing comment");
        self.open_edit(comment, false, Some(rollback));
        self.hosts.refresher.refresh_rows();
        true
    }

    /// Finish an edit interaction
    pub fn resolve_edit(&mut self, ticket: EditTicket, outcome: EditOutcome) {
        let EditTicket {
            comment,
            created,
            rollback,
        } = ticket;
        let id = comment.id;

        match outcome {
            EditOutcome::Accept(text) => {
                // The live entry wins over the ticket's copy.
                let mut accepted = self.comments.remove(&id).unwrap_or(comment);
                accepted.text = text;
                accepted.state = CommentState::Done;
                accepted.touch();
                self.comments.insert(id, accepted.clone());

                tracing::info!(comment_id = %id, created, "Comment accepted");
                if created {
                    self.events.emit_added(&accepted);
                } else {
                    self.events.emit_updated(&accepted);
                }
                self.hosts.sidebar.reveal_comments();
                self.hosts.refresher.refresh_rows();
            }
            EditOutcome::Remove => {
                self.remove(id);
            }
            EditOutcome::Cancel => {
                if created {
                    self.comments.remove(&id);
                    tracing::info!(comment_id = %id, "New comment discarded");
                } else if let Some(snapshot) = rollback {
                    self.comments.insert(snapshot.id(), snapshot.into_comment());
                    tracing::info!(comment_id = %id, "Comment restored from snapshot");
                }
                self.hosts.refresher.refresh_rows();
            }
        }
    }

    // ========================================================================
    // Remove / update / select
    // ========================================================================

    /// Delete a comment
    ///
    /// `removed` is emitted even when the id is not stored.
    pub fn remove(&mut self, id: CommentId) {
        if self.comments.remove(&id).is_some() {
            tracing::info!(comment_id = %id, "Comment removed");
        } else {
            tracing::debug!(comment_id = %id, "Remove for absent comment");
        }
        self.hosts.refresher.refresh_rows();
        self.events.emit_removed(&id);
    }

    /// Replace a stored comment; unknown ids are ignored
    pub fn update(&mut self, comment: Comment) -> bool {
        let Some(entry) = self.comments.get_mut(&comment.id) else {
            tracing::debug!(comment_id = %comment.id, "Update for absent comment ignored");
            return false;
        };

        *entry = comment;
        entry.selection.normalize();
        entry.touch();
        let updated = entry.clone();
        self.events.emit_updated(&updated);
        true
    }

    /// Announce that the user focused a comment
    pub fn select(&mut self, id: CommentId) -> bool {
        if !self.comments.contains_key(&id) {
            return false;
        }
        self.events.emit_selected(&id);
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Copy of the whole mapping
    pub fn get(&self) -> HashMap<CommentId, Comment> {
        self.comments.clone()
    }

    pub fn comment(&self, id: CommentId) -> Option<Comment> {
        self.comments.get(&id).cloned()
    }

    /// Comments in document order
    pub fn comments_sorted(&self) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self.comments.values().cloned().collect();
        comments.sort_by_key(|c| (c.selection.start, c.selection.end, c.id));
        comments
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn is_row_commented(&self, position: usize) -> bool {
        RowMatcher::new(&self.comments).is_row_commented(position)
    }

    /// Highlight ranges of the row at `position`
    pub fn get_modifiers(&self, position: usize, row_raw: &str) -> Vec<HighlightDescriptor> {
        RowMatcher::new(&self.comments).modifiers(position, row_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::host::QueuedDialogHost;
    use crate::comments::types::LogicalPoint;
    use crate::resolve::RenderTree;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Harness {
        store: AnnotationStore,
        dialogs: QueuedDialogHost,
        refreshes: Arc<AtomicUsize>,
        reveals: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
    }

    fn harness() -> Harness {
        let dialogs = QueuedDialogHost::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let reveals = Arc::new(AtomicUsize::new(0));
        let r = refreshes.clone();
        let s = reveals.clone();
        let mut store = AnnotationStore::new(Collaborators::new(
            dialogs.clone(),
            move || {
                r.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                s.fetch_add(1, Ordering::SeqCst);
            },
        ));

        let log = Arc::new(Mutex::new(Vec::new()));
        let events = store.events();
        let l = log.clone();
        events.on_added(move |c| l.lock().unwrap().push(format!("added {}", c.id)));
        let l = log.clone();
        events.on_updated(move |c| l.lock().unwrap().push(format!("updated {}", c.id)));
        let l = log.clone();
        events.on_pending(move |c| l.lock().unwrap().push(format!("pending {}", c.id)));
        let l = log.clone();
        events.on_removed(move |id| l.lock().unwrap().push(format!("removed {}", id)));
        let l = log.clone();
        events.on_selected(move |id| l.lock().unwrap().push(format!("selected {}", id)));

        Harness {
            store,
            dialogs,
            refreshes,
            reveals,
            log,
        }
    }

    impl Harness {
        fn events(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn ticket(&self) -> EditTicket {
            self.dialogs.take_next().unwrap().ticket
        }
    }

    fn span(start: (usize, usize), end: (usize, usize)) -> SelectionSpan {
        SelectionSpan::new(
            LogicalPoint::new(start.0, start.1),
            LogicalPoint::new(end.0, end.1),
            "sel",
        )
    }

    #[test]
    fn test_create_then_accept() {
        let mut h = harness();
        let outcome = h.store.create_span(span((3, 0), (3, 4))).unwrap();
        let id = outcome.comment.id;

        assert!(!outcome.merged);
        assert!(h.store.comment(id).unwrap().is_pending());
        assert_eq!(h.events(), vec![format!("pending {}", id)]);

        let request = h.dialogs.take_next().unwrap();
        assert!(request.is_new);
        h.store
            .resolve_edit(request.ticket, EditOutcome::Accept("disk full".into()));

        let stored = h.store.comment(id).unwrap();
        assert_eq!(stored.state, CommentState::Done);
        assert_eq!(stored.text, "disk full");
        assert_eq!(
            h.events(),
            vec![format!("pending {}", id), format!("added {}", id)]
        );
        assert_eq!(h.reveals.load(Ordering::SeqCst), 1);
        assert!(h.refreshes.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_cancel_new_comment_leaves_no_trace() {
        let mut h = harness();
        let id = h.store.create_span(span((3, 0), (3, 4))).unwrap().comment.id;

        let ticket = h.ticket();
        h.store.resolve_edit(ticket, EditOutcome::Cancel);

        assert!(h.store.is_empty());
        assert_eq!(h.events(), vec![format!("pending {}", id)]);
    }

    #[test]
    fn test_merge_single_row_overlap() {
        let mut h = harness();
        let first = h.store.create_span(span((4, 2), (4, 8))).unwrap().comment.id;
        let ticket = h.ticket();
        h.store.resolve_edit(ticket, EditOutcome::Accept("a".into()));

        let outcome = h.store.create_span(span((4, 6), (4, 12))).unwrap();
        assert!(outcome.merged);
        assert_eq!(outcome.comment.id, first);
        assert_eq!(h.store.len(), 1);

        let merged = h.store.comment(first).unwrap();
        assert_eq!(merged.selection.start, LogicalPoint::new(4, 2));
        assert_eq!(merged.selection.end, LogicalPoint::new(4, 12));
        assert!(merged.is_pending());

        let request = h.dialogs.take_next().unwrap();
        assert!(!request.is_new);
        assert_eq!(
            request.ticket.rollback().unwrap().comment().selection.end,
            LogicalPoint::new(4, 8)
        );
        h.store
            .resolve_edit(request.ticket, EditOutcome::Accept("b".into()));
        assert_eq!(h.events().last().unwrap(), &format!("updated {}", first));
    }

    #[test]
    fn test_cancel_merge_restores_snapshot() {
        let mut h = harness();
        let first = h.store.create_span(span((4, 2), (4, 8))).unwrap().comment.id;
        let ticket = h.ticket();
        h.store.resolve_edit(ticket, EditOutcome::Accept("keep".into()));
        let before = h.store.comment(first).unwrap();

        h.store.create_span(span((4, 6), (4, 12))).unwrap();
        let ticket = h.ticket();
        h.store.resolve_edit(ticket, EditOutcome::Cancel);

        assert_eq!(h.store.comment(first).unwrap(), before);
    }

    #[test]
    fn test_disjoint_same_row_spans_do_not_merge() {
        let mut h = harness();
        h.store.create_span(span((4, 0), (4, 2))).unwrap();
        h.store.create_span(span((4, 5), (4, 9))).unwrap();
        assert_eq!(h.store.len(), 2);
    }

    #[test]
    fn test_multi_row_crossing_ignores_offsets() {
        let mut h = harness();
        let id = h.store.create_span(span((10, 5), (10, 20))).unwrap().comment.id;

        // Different row range, so only positions are compared.
        let outcome = h.store.create_span(span((10, 30), (11, 2))).unwrap();
        assert!(outcome.merged);
        assert_eq!(outcome.comment.id, id);
        assert_eq!(outcome.comment.selection.start, LogicalPoint::new(10, 5));
        assert_eq!(outcome.comment.selection.end, LogicalPoint::new(11, 2));
    }

    #[test]
    fn test_ambiguous_overlap_leaves_store_untouched() {
        let mut h = harness();
        let a = h.store.create_span(span((1, 0), (2, 3))).unwrap().comment.id;
        let b = h.store.create_span(span((5, 0), (6, 3))).unwrap().comment.id;
        let before = h.store.get();
        let events = h.events().len();
        let dialogs = h.dialogs.open_count();

        let err = h.store.create_span(span((2, 0), (5, 1))).unwrap_err();
        let mut expected = vec![a, b];
        expected.sort();
        match err {
            AnnotationError::AmbiguousOverlap { crossing } => assert_eq!(crossing, expected),
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(h.store.get(), before);
        assert_eq!(h.events().len(), events);
        assert_eq!(h.dialogs.open_count(), dialogs);
    }

    #[test]
    fn test_remove_always_emits() {
        let mut h = harness();
        let id = h.store.create_span(span((0, 0), (0, 1))).unwrap().comment.id;
        let ghost = CommentId::new();

        h.store.remove(id);
        h.store.remove(ghost);

        assert!(h.store.is_empty());
        let events = h.events();
        assert_eq!(events[1], format!("removed {}", id));
        assert_eq!(events[2], format!("removed {}", ghost));
    }

    #[test]
    fn test_remove_outcome() {
        let mut h = harness();
        let id = h.store.create_span(span((0, 0), (0, 1))).unwrap().comment.id;
        let ticket = h.ticket();
        h.store.resolve_edit(ticket, EditOutcome::Remove);

        assert!(h.store.is_empty());
        assert_eq!(h.events().last().unwrap(), &format!("removed {}", id));
    }

    #[test]
    fn test_update_only_known_ids() {
        let mut h = harness();
        let id = h.store.create_span(span((0, 0), (0, 1))).unwrap().comment.id;

        let mut changed = h.store.comment(id).unwrap();
        changed.color = Some("#00ff00".into());
        assert!(h.store.update(changed));
        assert_eq!(
            h.store.comment(id).unwrap().color.as_deref(),
            Some("#00ff00")
        );

        let stranger = Comment::pending(span((9, 0), (9, 1)));
        let events = h.events().len();
        assert!(!h.store.update(stranger.clone()));
        assert!(h.store.comment(stranger.id).is_none());
        assert_eq!(h.events().len(), events);
    }

    #[test]
    fn test_get_returns_a_copy() {
        let mut h = harness();
        let id = h.store.create_span(span((0, 0), (0, 1))).unwrap().comment.id;

        let mut snapshot = h.store.get();
        snapshot.get_mut(&id).unwrap().text = "tampered".into();
        snapshot.clear();

        assert_eq!(h.store.len(), 1);
        assert!(h.store.comment(id).unwrap().text.is_empty());
    }

    #[test]
    fn test_edit_existing_then_cancel() {
        let mut h = harness();
        let id = h.store.create_span(span((0, 0), (0, 1))).unwrap().comment.id;
        let ticket = h.ticket();
        h.store.resolve_edit(ticket, EditOutcome::Accept("first".into()));

        assert!(h.store.edit(id, None));
        assert!(h.store.comment(id).unwrap().is_pending());

        let ticket = h.ticket();
        assert!(!ticket.is_new());
        h.store.resolve_edit(ticket, EditOutcome::Cancel);

        let restored = h.store.comment(id).unwrap();
        assert_eq!(restored.state, CommentState::Done);
        assert_eq!(restored.text, "first");
        assert!(!h.store.edit(CommentId::new(), None));
    }

    #[test]
    fn test_select_known_ids_only() {
        let mut h = harness();
        let id = h.store.create_span(span((0, 0), (0, 1))).unwrap().comment.id;

        assert!(h.store.select(id));
        assert!(!h.store.select(CommentId::new()));
        assert_eq!(h.events().last().unwrap(), &format!("selected {}", id));
    }

    #[test]
    fn test_row_queries() {
        let mut h = harness();
        h.store.create_span(span((12, 3), (10, 7))).unwrap();

        assert!(h.store.is_row_commented(10));
        assert!(h.store.is_row_commented(11));
        assert!(h.store.is_row_commented(12));
        assert!(!h.store.is_row_commented(13));

        let mods = h.store.get_modifiers(11, "interior");
        assert_eq!((mods[0].start, mods[0].end), (0, 8));
    }

    #[test]
    fn test_comments_sorted_by_start() {
        let mut h = harness();
        h.store.create_span(span((9, 0), (9, 1))).unwrap();
        h.store.create_span(span((2, 0), (2, 1))).unwrap();

        let positions: Vec<usize> = h
            .store
            .comments_sorted()
            .iter()
            .map(|c| c.selection.start.position)
            .collect();
        assert_eq!(positions, vec![2, 9]);
    }

    #[test]
    fn test_default_color_applies_to_inserts() {
        let h = harness();
        let mut store = h.store.with_default_color(Some("#ffcc00".into()));
        let outcome = store.create_span(span((0, 0), (0, 1))).unwrap();
        assert_eq!(outcome.comment.color.as_deref(), Some("#ffcc00"));
    }

    #[test]
    fn test_create_from_surface() {
        let mut h = harness();
        let row = "ab\u{1b}[31mCDEF\u{1b}[0mgh";
        let mut tree = RenderTree::from_rows(0, [row]);
        tree.select((0, 2), (0, 6));

        let outcome = h.store.create_at_selection(&mut tree).unwrap();
        assert_eq!(outcome.comment.selection.start, LogicalPoint::new(0, 2));
        assert_eq!(outcome.comment.selection.end, LogicalPoint::new(0, 11));
        assert_eq!(outcome.comment.selection.text, "CDEF");

        let mods = h.store.get_modifiers(0, row);
        assert_eq!((mods[0].start, mods[0].end), (2, 11));
    }

    #[test]
    fn test_create_without_selection_fails() {
        let mut h = harness();
        let mut tree = RenderTree::from_rows(0, ["row"]);
        assert!(matches!(
            h.store.create_at_selection(&mut tree),
            Err(AnnotationError::SelectionUnavailable)
        ));
        assert!(h.store.is_empty());
    }
}
