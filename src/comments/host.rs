//! Presentation collaborators and the edit interaction
//!
//! The store never draws anything. It asks a [`DialogHost`] to collect
//! comment text, a [`ViewRefresher`] to repaint highlighted rows and a
//! [`SidebarController`] to reveal the comment list.
//!
//! An edit interaction ends exactly once. That is enforced by ownership: the
//! host receives an [`EditTicket`] that is neither `Clone` nor `Copy`, and
//! [`AnnotationStore::resolve_edit`](super::AnnotationStore::resolve_edit)
//! consumes it.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use super::types::{Comment, CommentId, RollbackSnapshot};

/// How an edit interaction finished
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOutcome {
    /// Store the text and mark the comment done
    Accept(String),
    /// Delete the comment
    Remove,
    /// Drop a new comment, or roll a merge back
    Cancel,
}

/// Proof of one open edit interaction
#[derive(Debug)]
pub struct EditTicket {
    pub(crate) comment: Comment,
    pub(crate) created: bool,
    pub(crate) rollback: Option<RollbackSnapshot>,
}

impl EditTicket {
    pub fn comment_id(&self) -> CommentId {
        self.comment.id
    }

    /// Whether the comment was introduced by the `create` that opened this edit
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn rollback(&self) -> Option<&RollbackSnapshot> {
        self.rollback.as_ref()
    }
}

/// What the dialog host is asked to present
#[derive(Debug)]
pub struct EditRequest {
    /// Copy of the comment being edited
    pub comment: Comment,
    pub is_new: bool,
    /// Hand this back through `resolve_edit` once the user decides
    pub ticket: EditTicket,
}

/// Presents an editing affordance for a comment
///
/// Presentation is assumed non-closable: every request eventually comes
/// back through `resolve_edit` with one outcome.
pub trait DialogHost: Send {
    fn present(&mut self, request: EditRequest);
}

/// Repaints rows whose highlighting may have changed
pub trait ViewRefresher: Send {
    fn refresh_rows(&mut self);
}

/// Reveals the full comment list after a comment is accepted
pub trait SidebarController: Send {
    fn reveal_comments(&mut self);
}

impl<F: FnMut(EditRequest) + Send> DialogHost for F {
    fn present(&mut self, request: EditRequest) {
        self(request)
    }
}

impl<F: FnMut() + Send> ViewRefresher for F {
    fn refresh_rows(&mut self) {
        self()
    }
}

impl<F: FnMut() + Send> SidebarController for F {
    fn reveal_comments(&mut self) {
        self()
    }
}

/// Dialog host that parks requests until the caller collects them
///
/// Useful when the user's answer arrives from somewhere else entirely (a
/// script, a test, another task). Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct QueuedDialogHost {
    queue: Arc<Mutex<VecDeque<EditRequest>>>,
}

impl QueuedDialogHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest open request
    pub fn take_next(&self) -> Option<EditRequest> {
        self.queue.lock().pop_front()
    }

    pub fn open_count(&self) -> usize {
        self.queue.lock().len()
    }
}

impl DialogHost for QueuedDialogHost {
    fn present(&mut self, request: EditRequest) {
        tracing::debug!(
            comment_id = %request.comment.id,
            is_new = request.is_new,
            "Queued comment edit"
        );
        self.queue.lock().push_back(request);
    }
}

/// The collaborator set handed to an annotation store
pub struct Collaborators {
    pub dialog: Box<dyn DialogHost>,
    pub refresher: Box<dyn ViewRefresher>,
    pub sidebar: Box<dyn SidebarController>,
}

impl Collaborators {
    pub fn new(
        dialog: impl DialogHost + 'static,
        refresher: impl ViewRefresher + 'static,
        sidebar: impl SidebarController + 'static,
    ) -> Self {
        Self {
            dialog: Box::new(dialog),
            refresher: Box::new(refresher),
            sidebar: Box::new(sidebar),
        }
    }

    /// Queue dialogs and ignore refresh/sidebar requests
    pub fn queued(dialog: QueuedDialogHost) -> Self {
        Self::new(dialog, || {}, || {})
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
