//! Comment lifecycle notifications
//!
//! Five independent channels. Delivery is synchronous, in mutation order,
//! once per transition; nothing is buffered or replayed for late
//! subscribers.

use super::types::{Comment, CommentId};

/// Boxed subscriber callback
pub type Handler<T> = Box<dyn FnMut(&T) + Send>;

/// The five lifecycle event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Updated,
    Pending,
    Removed,
    Selected,
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Channel<T> {
    handlers: Vec<(u64, Handler<T>)>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<T> Channel<T> {
    fn publish(&mut self, event: &T) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }
}

/// Publish/subscribe hub owned by the annotation store
#[derive(Default)]
pub struct EventBus {
    added: Channel<Comment>,
    updated: Channel<Comment>,
    pending: Channel<Comment>,
    removed: Channel<CommentId>,
    selected: Channel<CommentId>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("added", &self.added.handlers.len())
            .field("updated", &self.updated.handlers.len())
            .field("pending", &self.pending.handlers.len())
            .field("removed", &self.removed.handlers.len())
            .field("selected", &self.selected.handlers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self, kind: EventKind) -> Subscription {
        self.next_id += 1;
        Subscription {
            kind,
            id: self.next_id,
        }
    }

    /// A comment's text was accepted for the first time
    pub fn on_added(&mut self, handler: impl FnMut(&Comment) + Send + 'static) -> Subscription {
        let sub = self.next(EventKind::Added);
        self.added.handlers.push((sub.id, Box::new(handler)));
        sub
    }

    /// An existing comment changed
    pub fn on_updated(&mut self, handler: impl FnMut(&Comment) + Send + 'static) -> Subscription {
        let sub = self.next(EventKind::Updated);
        self.updated.handlers.push((sub.id, Box::new(handler)));
        sub
    }

    /// A comment was created or merged and is waiting for its edit to finish
    pub fn on_pending(&mut self, handler: impl FnMut(&Comment) + Send + 'static) -> Subscription {
        let sub = self.next(EventKind::Pending);
        self.pending.handlers.push((sub.id, Box::new(handler)));
        sub
    }

    pub fn on_removed(
        &mut self,
        handler: impl FnMut(&CommentId) + Send + 'static,
    ) -> Subscription {
        let sub = self.next(EventKind::Removed);
        self.removed.handlers.push((sub.id, Box::new(handler)));
        sub
    }

    pub fn on_selected(
        &mut self,
        handler: impl FnMut(&CommentId) + Send + 'static,
    ) -> Subscription {
        let sub = self.next(EventKind::Selected);
        self.selected.handlers.push((sub.id, Box::new(handler)));
        sub
    }

    /// Drop a subscriber; returns false if it was already gone
    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        match sub.kind {
            EventKind::Added => self.added.remove(sub.id),
            EventKind::Updated => self.updated.remove(sub.id),
            EventKind::Pending => self.pending.remove(sub.id),
            EventKind::Removed => self.removed.remove(sub.id),
            EventKind::Selected => self.selected.remove(sub.id),
        }
    }

    pub(crate) fn emit_added(&mut self, comment: &Comment) {
        self.added.publish(comment);
    }

    pub(crate) fn emit_updated(&mut self, comment: &Comment) {
        self.updated.publish(comment);
    }

    pub(crate) fn emit_pending(&mut self, comment: &Comment) {
        self.pending.publish(comment);
    }

    pub(crate) fn emit_removed(&mut self, id: &CommentId) {
        self.removed.publish(id);
    }

    pub(crate) fn emit_selected(&mut self, id: &CommentId) {
        self.selected.publish(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::types::{LogicalPoint, SelectionSpan};
    use std::sync::{Arc, Mutex};

    fn comment() -> Comment {
        Comment::pending(SelectionSpan::new(
            LogicalPoint::new(0, 0),
            LogicalPoint::new(0, 1),
            "a",
        ))
    }

    #[test]
    fn test_delivery_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let sink = log.clone();
        bus.on_pending(move |c| sink.lock().unwrap().push(format!("pending {}", c.id)));
        let sink = log.clone();
        bus.on_added(move |c| sink.lock().unwrap().push(format!("added {}", c.id)));
        let sink = log.clone();
        bus.on_removed(move |id| sink.lock().unwrap().push(format!("removed {}", id)));

        let c = comment();
        bus.emit_pending(&c);
        bus.emit_added(&c);
        bus.emit_removed(&c.id);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                format!("pending {}", c.id),
                format!("added {}", c.id),
                format!("removed {}", c.id),
            ]
        );
    }

    #[test]
    fn test_channels_are_independent() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let sink = count.clone();
        bus.on_updated(move |_| *sink.lock().unwrap() += 1);

        let c = comment();
        bus.emit_added(&c);
        bus.emit_pending(&c);
        bus.emit_selected(&c.id);
        assert_eq!(*count.lock().unwrap(), 0);

        bus.emit_updated(&c);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let sink = count.clone();
        let sub = bus.on_selected(move |_| *sink.lock().unwrap() += 1);

        let id = CommentId::new();
        bus.emit_selected(&id);
        assert!(bus.unsubscribe(sub));
        assert!(!bus.unsubscribe(sub));
        bus.emit_selected(&id);

        assert_eq!(*count.lock().unwrap(), 1);
    }
}
