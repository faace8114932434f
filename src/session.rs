//! Session actor
//!
//! A tokio task owns the [`AnnotationStore`] of one log session. Handles
//! send commands over a bounded channel and wait for the reply, so every
//! store mutation (the crossing scan plus insert or merge in particular)
//! runs to completion before the next command is looked at.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use crate::comments::{
    AnnotationStore, Comment, CommentId, CreateOutcome, EditOutcome, EditTicket,
    HighlightDescriptor, SelectionSpan,
};
use crate::error::{AnnotationError, Result};

enum Command {
    CreateSpan {
        span: SelectionSpan,
        reply: oneshot::Sender<Result<CreateOutcome>>,
    },
    Edit {
        id: CommentId,
        reply: oneshot::Sender<bool>,
    },
    ResolveEdit {
        ticket: EditTicket,
        outcome: EditOutcome,
        reply: oneshot::Sender<()>,
    },
    Remove {
        id: CommentId,
        reply: oneshot::Sender<()>,
    },
    Update {
        comment: Comment,
        reply: oneshot::Sender<bool>,
    },
    Select {
        id: CommentId,
        reply: oneshot::Sender<bool>,
    },
    Get {
        reply: oneshot::Sender<HashMap<CommentId, Comment>>,
    },
    IsRowCommented {
        position: usize,
        reply: oneshot::Sender<bool>,
    },
    GetModifiers {
        position: usize,
        row_raw: String,
        reply: oneshot::Sender<Vec<HighlightDescriptor>>,
    },
    Shutdown {
        reply: oneshot::Sender<AnnotationStore>,
    },
}

/// Cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct CommentSession {
    tx: mpsc::Sender<Command>,
}

impl CommentSession {
    /// Move `store` into a new task; must be called inside a tokio runtime
    pub fn spawn(store: AnnotationStore, queue: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue.max(1));
        tokio::spawn(run(store, rx));
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| AnnotationError::SessionClosed)?;
        rx.await.map_err(|_| AnnotationError::SessionClosed)
    }

    pub async fn create(&self, span: SelectionSpan) -> Result<CreateOutcome> {
        self.request(|reply| Command::CreateSpan { span, reply })
            .await?
    }

    pub async fn edit(&self, id: CommentId) -> Result<bool> {
        self.request(|reply| Command::Edit { id, reply }).await
    }

    pub async fn resolve_edit(&self, ticket: EditTicket, outcome: EditOutcome) -> Result<()> {
        self.request(|reply| Command::ResolveEdit {
            ticket,
            outcome,
            reply,
        })
        .await
    }

    pub async fn remove(&self, id: CommentId) -> Result<()> {
        self.request(|reply| Command::Remove { id, reply }).await
    }

    pub async fn update(&self, comment: Comment) -> Result<bool> {
        self.request(|reply| Command::Update { comment, reply })
            .await
    }

    pub async fn select(&self, id: CommentId) -> Result<bool> {
        self.request(|reply| Command::Select { id, reply }).await
    }

    pub async fn get(&self) -> Result<HashMap<CommentId, Comment>> {
        self.request(|reply| Command::Get { reply }).await
    }

    pub async fn is_row_commented(&self, position: usize) -> Result<bool> {
        self.request(|reply| Command::IsRowCommented { position, reply })
            .await
    }

    pub async fn get_modifiers(
        &self,
        position: usize,
        row_raw: impl Into<String>,
    ) -> Result<Vec<HighlightDescriptor>> {
        let row_raw = row_raw.into();
        self.request(|reply| Command::GetModifiers {
            position,
            row_raw,
            reply,
        })
        .await
    }

    /// Stop the task and take the store back
    pub async fn shutdown(&self) -> Result<AnnotationStore> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

async fn run(mut store: AnnotationStore, mut rx: mpsc::Receiver<Command>) {
    tracing::debug!("Comment session started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::CreateSpan { span, reply } => {
                let _ = reply.send(store.create_span(span));
            }
            Command::Edit { id, reply } => {
                let _ = reply.send(store.edit(id, None));
            }
            Command::ResolveEdit {
                ticket,
                outcome,
                reply,
            } => {
                store.resolve_edit(ticket, outcome);
                let _ = reply.send(());
            }
            Command::Remove { id, reply } => {
                store.remove(id);
                let _ = reply.send(());
            }
            Command::Update { comment, reply } => {
                let _ = reply.send(store.update(comment));
            }
            Command::Select { id, reply } => {
                let _ = reply.send(store.select(id));
            }
            Command::Get { reply } => {
                let _ = reply.send(store.get());
            }
            Command::IsRowCommented { position, reply } => {
                let _ = reply.send(store.is_row_commented(position));
            }
            Command::GetModifiers {
                position,
                row_raw,
                reply,
            } => {
                let _ = reply.send(store.get_modifiers(position, &row_raw));
            }
            Command::Shutdown { reply } => {
                tracing::debug!(comments = store.len(), "Comment session stopped");
                let _ = reply.send(store);
                return;
            }
        }
    }

    tracing::debug!("Comment session handles dropped");
}
