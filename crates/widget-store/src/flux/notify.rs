use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::action::{ComponentKind, InstanceId};
use crate::StoreError;

/// Topics that must never be used by stores.
///
/// `error` is special-cased by event emitters in many environments, so failures are reported under `fail` instead.
const RESERVED_TOPICS: &[&str] = &["error"];

/// The kind of a store notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The instance's derived state changed.
    Change,
    /// The instance's data couldn't be loaded.
    Fail,
}

impl Event {
    /// Returns the unscoped topic of this event.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::Change => "change",
            Event::Fail => "fail",
        }
    }

    /// Returns the topic of this event scoped to a single instance, e.g. `change:<id>`.
    pub fn scoped_topic(&self, id: &InstanceId) -> String {
        format!("{}:{}", self.topic(), id)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

/// A notification delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: Event,
    pub component: ComponentKind,
    pub id: InstanceId,
}

/// A notification listener.
///
/// Removal is done by identity, so the same [Rc] that was passed to [NotificationBus::on] must be used.
pub type Listener = Rc<dyn Fn(&Notification)>;

/// A minimal publish/subscribe bus owned by a store.
pub struct NotificationBus {
    component: ComponentKind,
    listeners: HashMap<String, Vec<Listener>>,
}

impl NotificationBus {
    pub fn new(component: ComponentKind) -> Self {
        NotificationBus {
            component,
            listeners: HashMap::new(),
        }
    }

    /// Adds a listener for the provided topic.
    ///
    /// Adding the same listener twice makes it fire twice.
    pub fn on(&mut self, topic: impl Into<String>, listener: Listener) -> Result<(), StoreError> {
        let topic = topic.into();
        if RESERVED_TOPICS.contains(&topic.as_str()) {
            return Err(StoreError::ReservedTopic(topic));
        }

        self.listeners.entry(topic).or_default().push(listener);
        Ok(())
    }

    /// Removes one registration of the provided listener from the topic.
    ///
    /// Returns `false` if the listener wasn't registered.
    pub fn remove_listener(&mut self, topic: &str, listener: &Listener) -> bool {
        let Some(listeners) = self.listeners.get_mut(topic) else {
            return false;
        };

        let Some(position) = listeners.iter().position(|registered| Rc::ptr_eq(registered, listener)) else {
            return false;
        };
        listeners.remove(position);

        if listeners.is_empty() {
            self.listeners.remove(topic);
        }
        true
    }

    /// Calls every listener of the topic in registration order.
    ///
    /// Returns the number of invoked listeners.
    pub fn emit(&self, topic: &str, notification: &Notification) -> usize {
        let Some(listeners) = self.listeners.get(topic) else {
            return 0;
        };

        for listener in listeners {
            listener(notification);
        }
        listeners.len()
    }

    /// Emits the event on the instance-scoped topic and then on the unscoped one.
    pub fn emit_scoped(&self, event: Event, id: &InstanceId) {
        let notification = Notification {
            event,
            component: self.component,
            id: id.clone(),
        };

        let notified = self.emit(&event.scoped_topic(id), &notification) + self.emit(event.topic(), &notification);
        tracing::trace!("Emitted '{}' for {} '{}' to {} listener(s)", event, self.component, id, notified);
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners.get(topic).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;

    fn counting_listener() -> (Listener, Rc<RefCell<Vec<InstanceId>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let listener: Listener = {
            let seen = seen.clone();
            Rc::new(move |notification: &Notification| seen.borrow_mut().push(notification.id.clone()))
        };
        (listener, seen)
    }

    #[test]
    fn scoped_emit_reaches_scoped_and_unscoped_listeners() {
        let mut bus = NotificationBus::new(ComponentKind::Table);
        let (scoped, scoped_seen) = counting_listener();
        let (other, other_seen) = counting_listener();
        let (all, all_seen) = counting_listener();

        bus.on("change:a", scoped).unwrap();
        bus.on("change:b", other).unwrap();
        bus.on("change", all).unwrap();

        bus.emit_scoped(Event::Change, &InstanceId::from("a"));

        assert_eq!(*scoped_seen.borrow(), vec![InstanceId::from("a")]);
        assert!(other_seen.borrow().is_empty());
        assert_eq!(*all_seen.borrow(), vec![InstanceId::from("a")]);
    }

    #[test]
    fn removal_requires_the_same_listener() {
        let mut bus = NotificationBus::new(ComponentKind::Search);
        let (listener, seen) = counting_listener();
        let (lookalike, _) = counting_listener();

        bus.on("fail:a", listener.clone()).unwrap();
        assert!(!bus.remove_listener("fail:a", &lookalike));
        assert!(bus.remove_listener("fail:a", &listener));
        assert!(!bus.remove_listener("fail:a", &listener));

        bus.emit_scoped(Event::Fail, &InstanceId::from("a"));
        assert!(seen.borrow().is_empty());
        assert_eq!(bus.listener_count("fail:a"), 0);
    }

    #[test]
    fn reserved_topics_are_rejected() {
        let mut bus = NotificationBus::new(ComponentKind::PieChart);
        let (listener, _) = counting_listener();

        assert!(matches!(bus.on("error", listener), Err(StoreError::ReservedTopic(topic)) if topic == "error"));
    }
}
