//! Event channel - named events with synchronous delivery.
//!
//! Every view owns an [`EventChannel`]. Handlers subscribe to one event name
//! with [`EventChannel::on`] or to everything with [`EventChannel::on_all`];
//! both return a cleanup that unsubscribes.
//!
//! # Example
//!
//! ```
//! use spark_views::engine::EventChannel;
//! use serde_json::json;
//!
//! let channel = EventChannel::new();
//! let stop = channel.on("saved", |event| {
//!     assert_eq!(event.args, vec![json!(42)]);
//! });
//! channel.trigger("saved", vec![json!(42)]);
//! stop();
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::types::Cleanup;

// =============================================================================
// TYPES
// =============================================================================

/// A named event with positional arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub args: Vec<Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Event handler.
pub type EventHandler = Rc<dyn Fn(&Event)>;

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

#[derive(Default)]
struct HandlerRegistry {
    named: Vec<(usize, String, EventHandler)>,
    all: Vec<(usize, EventHandler)>,
    next_id: usize,
}

impl HandlerRegistry {
    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Shared event stream. Cloning yields another handle to the same stream.
#[derive(Clone, Default)]
pub struct EventChannel {
    registry: Rc<RefCell<HandlerRegistry>>,
}

/// Non-owning handle to an [`EventChannel`].
#[derive(Clone)]
pub struct WeakEventChannel {
    registry: Weak<RefCell<HandlerRegistry>>,
}

impl WeakEventChannel {
    pub fn upgrade(&self) -> Option<EventChannel> {
        self.registry.upgrade().map(|registry| EventChannel { registry })
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakEventChannel {
        WeakEventChannel {
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn ptr_eq(&self, other: &EventChannel) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }

    /// Subscribe to events called `name`.
    pub fn on(&self, name: &str, handler: impl Fn(&Event) + 'static) -> Cleanup {
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id();
            reg.named.push((id, name.to_string(), Rc::new(handler)));
            id
        };

        let weak = Rc::downgrade(&self.registry);
        Box::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry
                    .borrow_mut()
                    .named
                    .retain(|(handler_id, _, _)| *handler_id != id);
            }
        })
    }

    /// Subscribe to every event.
    pub fn on_all(&self, handler: impl Fn(&Event) + 'static) -> Cleanup {
        let id = {
            let mut reg = self.registry.borrow_mut();
            let id = reg.next_id();
            reg.all.push((id, Rc::new(handler)));
            id
        };

        let weak = Rc::downgrade(&self.registry);
        Box::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry
                    .borrow_mut()
                    .all
                    .retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    /// Fire `name` with `args`.
    pub fn trigger(&self, name: &str, args: Vec<Value>) {
        self.emit(&Event::new(name, args));
    }

    /// Deliver `event` to name-specific handlers, then catch-all handlers.
    pub fn emit(&self, event: &Event) {
        // Clone out so handlers may subscribe or unsubscribe while running.
        let handlers: Vec<EventHandler> = {
            let reg = self.registry.borrow();
            reg.named
                .iter()
                .filter(|(_, name, _)| *name == event.name)
                .map(|(_, _, handler)| handler.clone())
                .chain(reg.all.iter().map(|(_, handler)| handler.clone()))
                .collect()
        };

        for handler in handlers {
            handler(event);
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        let reg = self.registry.borrow();
        reg.named.len() + reg.all.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log_into(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> impl Fn(&Event) + 'static {
        let log = log.clone();
        move |event: &Event| log.borrow_mut().push(format!("{tag}:{}", event.name))
    }

    #[test]
    fn test_named_then_all() {
        let channel = EventChannel::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let _all = channel.on_all(log_into(&log, "all"));
        let _named = channel.on("foo", log_into(&log, "foo"));

        channel.trigger("foo", vec![json!("bar")]);
        channel.trigger("baz", vec![]);

        assert_eq!(*log.borrow(), vec!["foo:foo", "all:foo", "all:baz"]);
    }

    #[test]
    fn test_cleanup_unsubscribes() {
        let channel = EventChannel::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let stop = channel.on("foo", log_into(&log, "foo"));
        assert_eq!(channel.listener_count(), 1);
        stop();
        assert_eq!(channel.listener_count(), 0);

        channel.trigger("foo", vec![]);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_handler_may_unsubscribe_during_dispatch() {
        let channel = EventChannel::new();
        let stop_slot: Rc<RefCell<Option<Cleanup>>> = Rc::new(RefCell::new(None));
        let stop_clone = stop_slot.clone();

        let stop = channel.on("once", move |_| {
            if let Some(stop) = stop_clone.borrow_mut().take() {
                stop();
            }
        });
        *stop_slot.borrow_mut() = Some(stop);

        channel.trigger("once", vec![]);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn test_weak_handle() {
        let channel = EventChannel::new();
        let weak = channel.downgrade();
        assert!(weak.upgrade().is_some_and(|c| c.ptr_eq(&channel)));
        drop(channel);
        assert!(weak.upgrade().is_none());
    }
}
