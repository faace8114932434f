//! Selection to logical offset resolution
//!
//! The surface tells us what the user *saw*: the rendered text before the
//! selection boundary and the rendered selected text. We find the raw span
//! that renders to each by matching an escape-tolerant pattern against the
//! raw row.

use regex::Regex;
use serde::Serialize;

use super::escape::{char_offset, escape_tolerant_pattern};
use super::surface::{RenderingSurface, ReportedSelection, SelectionEdge};
use crate::comments::{LogicalPoint, SelectionSpan};
use crate::error::{AnnotationError, ResolutionEdge, Result};

/// Default bound for the row boundary ancestor walk
pub const DEFAULT_MAX_ROW_DEPTH: usize = 32;

/// Raw span found for one row of a selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalOffsetResult {
    /// Raw text between `start` and `end`, escapes included
    pub selection: String,
    /// Char offset into the raw row
    pub start: usize,
    /// Char offset into the raw row, exclusive
    pub end: usize,
}

/// Maps rendered selections back to raw row offsets
#[derive(Debug, Clone)]
pub struct OffsetResolver {
    max_row_depth: usize,
}

impl Default for OffsetResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROW_DEPTH)
    }
}

impl OffsetResolver {
    pub fn new(max_row_depth: usize) -> Self {
        Self { max_row_depth }
    }

    pub fn max_row_depth(&self) -> usize {
        self.max_row_depth
    }

    /// Resolve one row given the rendered text before the boundary
    ///
    /// With `anchor_at_end` only the `before` text is matched and the head
    /// span `[0, start)` of the row comes back; this is how the last row of
    /// a multi-row selection is resolved.
    pub fn resolve(
        &self,
        raw: &str,
        before: &str,
        selected: &str,
        anchor_at_end: bool,
    ) -> Result<LogicalOffsetResult> {
        let mut start_byte = 0;
        if !before.is_empty() {
            let pattern = Regex::new(&escape_tolerant_pattern(before))?;
            let found =
                pattern
                    .find(raw)
                    .ok_or_else(|| AnnotationError::OffsetResolutionFailure {
                        edge: ResolutionEdge::Beginning,
                        text: before.to_string(),
                    })?;
            start_byte = found.end();
        }
        let start = char_offset(raw, start_byte);

        if anchor_at_end {
            return Ok(LogicalOffsetResult {
                selection: raw[..start_byte].to_string(),
                start: 0,
                end: start,
            });
        }

        let tail = &raw[start_byte..];
        let pattern = Regex::new(&escape_tolerant_pattern(selected))?;
        let found = pattern
            .find(tail)
            .ok_or_else(|| AnnotationError::OffsetResolutionFailure {
                edge: ResolutionEdge::End,
                text: selected.to_string(),
            })?;
        let end_byte = start_byte + found.end();

        Ok(LogicalOffsetResult {
            selection: raw[start_byte..end_byte].to_string(),
            start,
            end: char_offset(raw, end_byte),
        })
    }

    /// Collapse the live selection onto `edge` and resolve that row
    pub fn resolve_edge<S: RenderingSurface + ?Sized>(
        &self,
        surface: &mut S,
        raw: &str,
        selected: &str,
        edge: SelectionEdge,
    ) -> Result<LogicalOffsetResult> {
        surface.collapse(edge)?;
        let before = surface.text_before_caret(self.max_row_depth)?;
        tracing::debug!(
            edge = ?edge,
            before = %before,
            selected = %selected,
            "Resolving selection edge"
        );
        self.resolve(raw, &before, selected, edge == SelectionEdge::End)
    }

    /// Turn the surface's live selection into a logical span
    ///
    /// The live selection is put back afterwards, whatever the outcome.
    pub fn resolve_selection<S: RenderingSurface + ?Sized>(
        &self,
        surface: &mut S,
        selection: &ReportedSelection,
        start_row_raw: &str,
        end_row_raw: &str,
    ) -> Result<SelectionSpan> {
        let stored = surface
            .remember()
            .ok_or(AnnotationError::SelectionUnavailable)?;
        let span = self.resolve_remembered(surface, &stored, selection, start_row_raw, end_row_raw);
        surface.restore(&stored);
        span
    }

    fn resolve_remembered<S: RenderingSurface + ?Sized>(
        &self,
        surface: &mut S,
        stored: &S::Snapshot,
        selection: &ReportedSelection,
        start_row_raw: &str,
        end_row_raw: &str,
    ) -> Result<SelectionSpan> {
        let first = selection.start_position();
        let last = selection.end_position();

        if selection.is_single_row() {
            let sel =
                self.resolve_edge(surface, start_row_raw, &selection.text, SelectionEdge::Start)?;
            return Ok(SelectionSpan::new(
                LogicalPoint::new(first, sel.start),
                LogicalPoint::new(last, sel.end),
                selection.text.clone(),
            ));
        }

        let rows: Vec<&str> = selection
            .text
            .split(|c| c == '\n' || c == '\r')
            .collect();
        if rows.len() < 2 {
            return Err(AnnotationError::RowSplitFailure { rows: rows.len() });
        }

        let head = self.resolve_edge(surface, start_row_raw, rows[0], SelectionEdge::Start)?;
        surface.restore(stored);
        let tail = self.resolve_edge(
            surface,
            end_row_raw,
            rows[rows.len() - 1],
            SelectionEdge::End,
        )?;

        Ok(SelectionSpan::new(
            LogicalPoint::new(first, head.start),
            LogicalPoint::new(last, tail.end),
            selection.text.clone(),
        ))
    }
}
