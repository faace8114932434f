//! Comment annotations
//!
//! Comments anchored to logical `(row position, char offset)` coordinates of
//! a log whose rows carry terminal escape sequences.
//!
//! # Features
//!
//! - Insert or merge on create:
//!   - no crossing comment: a new pending comment
//!   - one crossing comment: its span grows to cover the selection
//!   - several: nothing is stored and the caller gets `AmbiguousOverlap`
//!
//! - A single-fire edit interaction (accept, remove, cancel with rollback)
//!
//! - Row queries for the renderer and lifecycle events for the sidebar

mod events;
mod host;
mod matcher;
mod merge;
mod store;
mod types;

pub use events::{EventBus, EventKind, Handler, Subscription};
pub use host::{
    Collaborators, DialogHost, EditOutcome, EditRequest, EditTicket, QueuedDialogHost,
    SidebarController, ViewRefresher,
};
pub use matcher::{HighlightDescriptor, RowMatcher};
pub use merge::{crosses, MergeDecision, OverlapMerger};
pub use store::{AnnotationStore, CreateOutcome};
pub use types::{Comment, CommentId, CommentState, LogicalPoint, RollbackSnapshot, SelectionSpan};
