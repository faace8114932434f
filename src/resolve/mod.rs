//! Selection resolution
//!
//! Turns what the user selected on screen into logical `(position, offset)`
//! coordinates over raw row text.
//!
//! - `escape`: the control/CSI grammar and char offset helpers
//! - `surface`: the contract a rendering layer implements
//! - `tree`: an in-memory rendering surface
//! - `resolver`: the escape-tolerant offset resolver

pub mod escape;
mod resolver;
mod surface;
mod tree;

pub use escape::render_visible;
pub use resolver::{LogicalOffsetResult, OffsetResolver, DEFAULT_MAX_ROW_DEPTH};
pub use surface::{
    find_row_boundary, RenderingSurface, ReportedSelection, RowTree, SelectionEdge,
};
pub use tree::{Caret, LiveSelection, NodeId, RenderTree};
