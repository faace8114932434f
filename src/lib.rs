//! Log viewer comments
//!
//! Comments anchored to logical `(row position, char offset)` coordinates of
//! a virtualized log whose rows carry ANSI escape sequences. The rendered
//! selection is mapped back to raw offsets, overlapping selections are
//! merged into a single comment, and rows are queried for highlighting.

pub mod comments;
pub mod config;
pub mod error;
pub mod html;
pub mod resolve;
pub mod script;
pub mod session;

pub use comments::{
    AnnotationStore, Collaborators, Comment, CommentId, CommentState, CreateOutcome, EditOutcome,
    EditTicket, HighlightDescriptor, LogicalPoint, QueuedDialogHost, SelectionSpan,
};
pub use config::Config;
pub use error::{AnnotationError, Result};
pub use resolve::{OffsetResolver, RenderTree, RenderingSurface, ReportedSelection};
pub use session::CommentSession;
