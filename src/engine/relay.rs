//! Event relay - forward a child's events to its parent.
//!
//! Managers relay every child they create, so an event fired deep in the
//! view tree is re-emitted, verbatim, on each ancestor's channel in turn.
//! The relay only holds a weak handle to the parent channel.

use super::events::EventChannel;
use crate::types::Cleanup;

/// Re-emit every event on `child` through `parent`.
///
/// Returns a cleanup that stops forwarding.
pub fn relay(child: &EventChannel, parent: &EventChannel) -> Cleanup {
    tracing::trace!("relaying child events to parent channel");
    let target = parent.downgrade();
    child.on_all(move |event| {
        if let Some(parent) = target.upgrade() {
            parent.emit(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Event;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_relay_is_transitive_and_verbatim() {
        let grandparent = EventChannel::new();
        let parent = EventChannel::new();
        let child = EventChannel::new();

        let _up1 = relay(&child, &parent);
        let _up2 = relay(&parent, &grandparent);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _listen = grandparent.on("foo", move |event| seen_clone.borrow_mut().push(event.clone()));

        child.trigger("foo", vec![json!("bar"), json!(1)]);

        assert_eq!(
            *seen.borrow(),
            vec![Event::new("foo", vec![json!("bar"), json!(1)])]
        );
    }

    #[test]
    fn test_relay_cleanup_stops_forwarding() {
        let parent = EventChannel::new();
        let child = EventChannel::new();

        let stop = relay(&child, &parent);
        assert_eq!(child.listener_count(), 1);
        stop();
        assert_eq!(child.listener_count(), 0);
    }

    #[test]
    fn test_relay_does_not_keep_parent_alive() {
        let parent = EventChannel::new();
        let child = EventChannel::new();
        let weak = parent.downgrade();

        let _relay = relay(&child, &parent);
        drop(parent);

        assert!(weak.upgrade().is_none());
        child.trigger("foo", vec![]);
    }
}
