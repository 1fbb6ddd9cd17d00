use std::collections::HashMap;
use std::mem;

/// Topic for every processed frame, whether or not a symbol was found.
pub const TOPIC_PROCESSED: &str = "processed";

/// Topic fired only when a frame yielded a decoded symbol.
pub const TOPIC_DETECTED: &str = "detected";

type Callback<T> = Box<dyn FnMut(Option<&T>)>;

struct Subscription<T> {
    callback: Callback<T>,
    once: bool,
}

/// Publish/subscribe registry keyed by topic name.
///
/// Delivery is synchronous and in registration order. Subscribers added
/// during a delivery pass are not invoked in that pass; `once` subscribers
/// are removed immediately after being invoked. The bus holds no state
/// beyond its subscriber lists, and is owned by its pipeline rather than
/// looked up globally, so independent pipelines cannot leak events into
/// each other.
pub struct EventBus<T> {
    topics: HashMap<String, Vec<Subscription<T>>>,
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, topic: &str, callback: impl FnMut(Option<&T>) + 'static) {
        self.register(topic, Box::new(callback), false);
    }

    /// Registers a callback that is removed after its first invocation.
    pub fn subscribe_once(&mut self, topic: &str, callback: impl FnMut(Option<&T>) + 'static) {
        self.register(topic, Box::new(callback), true);
    }

    fn register(&mut self, topic: &str, callback: Callback<T>, once: bool) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscription { callback, once });
    }

    /// Invokes every current subscriber for `topic` with `payload`.
    ///
    /// Publishing to a topic with no subscribers is a no-op.
    pub fn publish(&mut self, topic: &str, payload: Option<&T>) {
        let Some(slot) = self.topics.get_mut(topic) else {
            return;
        };
        // Deliver against a snapshot so registrations made while callbacks
        // run land in the fresh list and are appended afterwards.
        let mut current = mem::take(slot);
        for sub in &mut current {
            (sub.callback)(payload);
        }
        current.retain(|sub| !sub.once);

        let slot = self.topics.entry(topic.to_string()).or_default();
        let added = mem::take(slot);
        *slot = current;
        slot.extend(added);
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let mut bus: EventBus<u32> = EventBus::new();
        bus.publish("missing", Some(&1));
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let mut bus: EventBus<u32> = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.subscribe("topic", move |_| seen.borrow_mut().push(tag));
        }

        bus.publish("topic", None);
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_payload_reaches_every_subscriber() {
        let mut bus: EventBus<u32> = EventBus::new();
        let sum = Rc::new(RefCell::new(0u32));

        for _ in 0..3 {
            let sum = sum.clone();
            bus.subscribe("topic", move |payload| {
                *sum.borrow_mut() += payload.copied().unwrap_or(0);
            });
        }

        bus.publish("topic", Some(&7));
        assert_eq!(*sum.borrow(), 21);
    }

    #[test]
    fn test_once_subscriber_removed_after_firing() {
        let mut bus: EventBus<u32> = EventBus::new();
        let calls = Rc::new(RefCell::new(0));

        let calls_once = calls.clone();
        bus.subscribe_once("topic", move |_| *calls_once.borrow_mut() += 1);
        let calls_kept = calls.clone();
        bus.subscribe("topic", move |_| *calls_kept.borrow_mut() += 1);

        bus.publish("topic", None);
        bus.publish("topic", None);

        // once fired 1 time, the plain subscriber 2 times
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(bus.subscriber_count("topic"), 1);
    }

    #[test]
    fn test_topics_are_independent() {
        let mut bus: EventBus<u32> = EventBus::new();
        let hits = Rc::new(RefCell::new(0));

        let hits_a = hits.clone();
        bus.subscribe("a", move |_| *hits_a.borrow_mut() += 1);

        bus.publish("b", None);
        assert_eq!(*hits.borrow(), 0);
        bus.publish("a", None);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_empty_payload_is_delivered_as_none() {
        let mut bus: EventBus<u32> = EventBus::new();
        let saw_none = Rc::new(RefCell::new(false));

        let saw = saw_none.clone();
        bus.subscribe("topic", move |payload| *saw.borrow_mut() = payload.is_none());

        bus.publish("topic", None);
        assert!(*saw_none.borrow());
    }
}
