//! Scripted replay
//!
//! Drives a store against a painted log the way a user would: select a
//! range, create, answer the dialog. Used by the driver binary.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::comments::{
    AnnotationStore, Collaborators, Comment, CommentId, EditOutcome, EventKind, QueuedDialogHost,
};
use crate::config::Config;
use crate::html::inject_highlights;
use crate::resolve::{RenderTree, RenderingSurface};

/// One scripted user action
///
/// `index` addresses comments in document order at the time the step runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ScriptStep {
    /// Select `[position, visible offset]` to `[position, visible offset]`,
    /// create a comment and answer its dialog
    Comment {
        anchor: [usize; 2],
        focus: [usize; 2],
        outcome: EditOutcome,
    },
    Edit {
        index: usize,
        outcome: EditOutcome,
    },
    Remove {
        index: usize,
    },
    Select {
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub kind: String,
    pub id: CommentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub position: usize,
    pub commented: bool,
    pub html: String,
}

/// Everything a replay produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptReport {
    pub comments: Vec<Comment>,
    pub events: Vec<EventRecord>,
    pub failures: Vec<StepFailure>,
    pub rows: Vec<RowReport>,
}

pub fn parse_script(json: &str) -> serde_json::Result<Vec<ScriptStep>> {
    serde_json::from_str(json)
}

fn kind_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Added => "added",
        EventKind::Updated => "updated",
        EventKind::Pending => "pending",
        EventKind::Removed => "removed",
        EventKind::Selected => "selected",
    }
}

fn record_events(store: &mut AnnotationStore) -> Arc<Mutex<Vec<EventRecord>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let push = |kind: EventKind| {
        let log = log.clone();
        move |id: CommentId| {
            log.lock().push(EventRecord {
                kind: kind_name(kind).to_string(),
                id,
            })
        }
    };

    let events = store.events();
    let added = push(EventKind::Added);
    events.on_added(move |c| added(c.id));
    let updated = push(EventKind::Updated);
    events.on_updated(move |c| updated(c.id));
    let pending = push(EventKind::Pending);
    events.on_pending(move |c| pending(c.id));
    let removed = push(EventKind::Removed);
    events.on_removed(move |id| removed(*id));
    let selected = push(EventKind::Selected);
    events.on_selected(move |id| selected(*id));

    log
}

/// Run `steps` against the rows painted in `tree`
pub fn replay(tree: &mut RenderTree, steps: &[ScriptStep], config: &Config) -> ScriptReport {
    let dialogs = QueuedDialogHost::new();
    let mut store = AnnotationStore::new(Collaborators::queued(dialogs.clone()))
        .with_resolver(config.offset_resolver())
        .with_default_color(config.highlight.default_color.clone());
    let log = record_events(&mut store);
    let mut failures = Vec::new();

    for (step, action) in steps.iter().enumerate() {
        if let Err(error) = run_step(tree, &mut store, &dialogs, action) {
            tracing::warn!(step, error = %error, "Script step failed");
            failures.push(StepFailure { step, error });
        }
    }

    let highlight = config.highlight_config();
    let rows = tree
        .row_positions()
        .filter_map(|position| {
            let raw = tree.row_text(position)?;
            let modifiers = store.get_modifiers(position, raw);
            Some(RowReport {
                position,
                commented: store.is_row_commented(position),
                html: inject_highlights(raw, &modifiers, &highlight).html,
            })
        })
        .collect();

    let events = log.lock().clone();
    ScriptReport {
        comments: store.comments_sorted(),
        events,
        failures,
        rows,
    }
}

fn run_step(
    tree: &mut RenderTree,
    store: &mut AnnotationStore,
    dialogs: &QueuedDialogHost,
    action: &ScriptStep,
) -> std::result::Result<(), String> {
    match action {
        ScriptStep::Comment {
            anchor,
            focus,
            outcome,
        } => {
            if !tree.select((anchor[0], anchor[1]), (focus[0], focus[1])) {
                return Err(format!(
                    "selection {:?}..{:?} is off the painted rows",
                    anchor, focus
                ));
            }
            store.create_at_selection(tree).map_err(|e| e.to_string())?;
            answer(store, dialogs, outcome.clone())
        }
        ScriptStep::Edit { index, outcome } => {
            let id = nth(store, *index)?;
            store.edit(id, None);
            answer(store, dialogs, outcome.clone())
        }
        ScriptStep::Remove { index } => {
            let id = nth(store, *index)?;
            store.remove(id);
            Ok(())
        }
        ScriptStep::Select { index } => {
            let id = nth(store, *index)?;
            store.select(id);
            Ok(())
        }
    }
}

/// Id of the `index`th comment in document order
fn nth(store: &AnnotationStore, index: usize) -> std::result::Result<CommentId, String> {
    store
        .comments_sorted()
        .get(index)
        .map(|c| c.id)
        .ok_or_else(|| format!("no comment at index {}", index))
}

fn answer(
    store: &mut AnnotationStore,
    dialogs: &QueuedDialogHost,
    outcome: EditOutcome,
) -> std::result::Result<(), String> {
    let request = dialogs
        .take_next()
        .ok_or_else(|| "no edit dialog was opened".to_string())?;
    store.resolve_edit(request.ticket, outcome);
    Ok(())
}
