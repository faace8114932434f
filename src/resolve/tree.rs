//! In-memory rendering surface
//!
//! A small arena tree shaped like what a scroll box paints: a root, one
//! boundary node per row, one span per visible run of the raw row and a text
//! node inside each span. Escape runs produce no nodes at all, which is
//! exactly why raw offsets and rendered offsets drift apart.

use std::collections::BTreeMap;

use super::escape::{byte_offset, char_len, char_slice, segments, SegmentKind};
use super::surface::{
    find_row_boundary, RenderingSurface, ReportedSelection, RowTree, SelectionEdge,
};
use crate::error::{AnnotationError, Result};

/// Depth used when the tree looks up a caret's row on its own behalf
const LOOKUP_DEPTH: usize = 8;

/// Arena index of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Row { position: usize },
    Span,
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A position inside a text node, offset in chars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// The user's live selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSelection {
    pub anchor: Caret,
    pub focus: Caret,
}

#[derive(Debug, Clone)]
struct RowEntry {
    raw: String,
    node: NodeId,
}

/// Rows of a log painted into a node tree, plus a live selection
#[derive(Debug, Clone)]
pub struct RenderTree {
    nodes: Vec<Node>,
    rows: BTreeMap<usize, RowEntry>,
    selection: Option<LiveSelection>,
}

impl Default for RenderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTree {
    const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            rows: BTreeMap::new(),
            selection: None,
        }
    }

    /// Paint `rows` at consecutive positions starting from `first_position`
    pub fn from_rows<I, S>(first_position: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tree = Self::new();
        for (i, raw) in rows.into_iter().enumerate() {
            tree.push_row(first_position + i, raw);
        }
        tree
    }

    /// Paint every line of a log, starting at position 0
    pub fn from_log(text: &str) -> Self {
        Self::from_rows(0, text.lines())
    }

    fn add(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Paint (or repaint) one row
    pub fn push_row(&mut self, position: usize, raw: impl Into<String>) -> NodeId {
        let raw = raw.into();
        if let Some(old) = self.rows.remove(&position) {
            self.nodes[Self::ROOT.0].children.retain(|c| *c != old.node);
            self.nodes[old.node.0].parent = None;
        }

        let row = self.add(NodeKind::Row { position }, Self::ROOT);
        let mut painted = false;
        for segment in segments(&raw) {
            if segment.kind == SegmentKind::Visible {
                let span = self.add(NodeKind::Span, row);
                self.add(NodeKind::Text(segment.text.to_string()), span);
                painted = true;
            }
        }
        if !painted {
            self.add(NodeKind::Text(String::new()), row);
        }

        self.rows.insert(position, RowEntry { raw, node: row });
        row
    }

    /// Add chrome text that belongs to no row (a header, a banner)
    pub fn append_banner(&mut self, text: impl Into<String>) -> NodeId {
        let span = self.add(NodeKind::Span, Self::ROOT);
        self.add(NodeKind::Text(text.into()), span)
    }

    pub fn row_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.keys().copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Text as painted for the row at `position`
    pub fn visible_row(&self, position: usize) -> Option<String> {
        let entry = self.rows.get(&position)?;
        Some(
            self.text_nodes(entry.node)
                .into_iter()
                .map(|t| self.text_of(t))
                .collect(),
        )
    }

    fn text_of(&self, node: NodeId) -> &str {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => text,
            _ => "",
        }
    }

    /// Text nodes below `node`, in document order
    fn text_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let n = &self.nodes[current.0];
            if matches!(n.kind, NodeKind::Text(_)) {
                out.push(current);
            }
            stack.extend(n.children.iter().rev());
        }
        out
    }

    fn row_position(&self, node: NodeId) -> Option<usize> {
        let row = find_row_boundary(self, node, LOOKUP_DEPTH).ok()?;
        match self.nodes[row.0].kind {
            NodeKind::Row { position } => Some(position),
            _ => None,
        }
    }

    /// Caret for a visible char offset within a row
    pub fn caret_at(&self, position: usize, visible_offset: usize) -> Option<Caret> {
        let entry = self.rows.get(&position)?;
        let mut acc = 0;
        for node in self.text_nodes(entry.node) {
            let len = char_len(self.text_of(node));
            if visible_offset <= acc + len {
                return Some(Caret {
                    node,
                    offset: visible_offset - acc,
                });
            }
            acc += len;
        }
        None
    }

    /// Row position and visible offset of a caret
    fn caret_visible(&self, caret: Caret) -> Option<(usize, usize)> {
        let position = self.row_position(caret.node)?;
        let entry = self.rows.get(&position)?;
        let mut acc = 0;
        for node in self.text_nodes(entry.node) {
            if node == caret.node {
                return Some((position, acc + caret.offset));
            }
            acc += char_len(self.text_of(node));
        }
        None
    }

    /// Document order key; carets outside rows sort last
    fn caret_key(&self, caret: Caret) -> (usize, usize, usize) {
        let position = self.row_position(caret.node).unwrap_or(usize::MAX);
        (position, caret.node.0, caret.offset)
    }

    fn ordered(&self, selection: LiveSelection) -> LiveSelection {
        if self.caret_key(selection.focus) < self.caret_key(selection.anchor) {
            LiveSelection {
                anchor: selection.focus,
                focus: selection.anchor,
            }
        } else {
            selection
        }
    }

    /// Select from `anchor` to `focus`, both `(position, visible offset)`
    ///
    /// Returns false and leaves the selection alone if either end is off
    /// the painted rows.
    pub fn select(&mut self, anchor: (usize, usize), focus: (usize, usize)) -> bool {
        match (
            self.caret_at(anchor.0, anchor.1),
            self.caret_at(focus.0, focus.1),
        ) {
            (Some(anchor), Some(focus)) => {
                self.selection = Some(LiveSelection { anchor, focus });
                true
            }
            _ => false,
        }
    }

    pub fn set_selection(&mut self, anchor: Caret, focus: Caret) {
        self.selection = Some(LiveSelection { anchor, focus });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn live_selection(&self) -> Option<LiveSelection> {
        self.selection
    }
}

impl RowTree for RenderTree {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn is_row_boundary(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(node.0).map(|n| &n.kind),
            Some(NodeKind::Row { .. })
        )
    }
}

impl RenderingSurface for RenderTree {
    type Snapshot = LiveSelection;

    fn row_text(&self, position: usize) -> Option<&str> {
        self.rows.get(&position).map(|entry| entry.raw.as_str())
    }

    fn reported_selection(&self) -> Option<ReportedSelection> {
        let selection = self.selection?;
        let anchor_position = self.row_position(selection.anchor.node)?;
        let focus_position = self.row_position(selection.focus.node)?;

        let ordered = self.ordered(selection);
        let (start_row, start_offset) = self.caret_visible(ordered.anchor)?;
        let (end_row, end_offset) = self.caret_visible(ordered.focus)?;

        let mut rows = Vec::new();
        for position in self.rows.range(start_row..=end_row).map(|(p, _)| *p) {
            let visible = self.visible_row(position)?;
            let from = if position == start_row { start_offset } else { 0 };
            let to = if position == end_row {
                end_offset
            } else {
                char_len(&visible)
            };
            rows.push(char_slice(&visible, from, to).to_string());
        }

        Some(ReportedSelection {
            anchor_position,
            focus_position,
            text: rows.join("\n"),
        })
    }

    fn remember(&self) -> Option<LiveSelection> {
        self.selection.map(|s| self.ordered(s))
    }

    fn restore(&mut self, snapshot: &LiveSelection) {
        self.selection = Some(*snapshot);
    }

    fn collapse(&mut self, edge: SelectionEdge) -> Result<()> {
        let selection = self
            .selection
            .ok_or(AnnotationError::SelectionUnavailable)?;
        let ordered = self.ordered(selection);
        let caret = match edge {
            SelectionEdge::Start => ordered.anchor,
            SelectionEdge::End => ordered.focus,
        };
        self.selection = Some(LiveSelection {
            anchor: caret,
            focus: caret,
        });
        Ok(())
    }

    fn text_before_caret(&mut self, max_depth: usize) -> Result<String> {
        let caret = self
            .selection
            .ok_or(AnnotationError::SelectionUnavailable)?
            .anchor;
        let row = find_row_boundary(&*self, caret.node, max_depth)?;

        let mut before = String::new();
        for node in self.text_nodes(row) {
            let text = self.text_of(node);
            if node == caret.node {
                before.push_str(&text[..byte_offset(text, caret.offset)]);
                break;
            }
            before.push_str(text);
        }

        self.selection = None;
        Ok(before)
    }
}
