use std::cell::RefCell;
use std::rc::Rc;

use crate::flux::{Event, InstanceId, Listener, Notification, NotificationBus};

/// Records every notification it receives.
#[derive(Default, Clone)]
pub struct NotificationLog {
    seen: Rc<RefCell<Vec<Notification>>>,
}

impl NotificationLog {
    /// Subscribes to each of the topics on the bus.
    pub fn listen(&self, bus: &mut NotificationBus, topics: &[&str]) {
        let listener: Listener = {
            let seen = self.seen.clone();
            Rc::new(move |notification: &Notification| seen.borrow_mut().push(notification.clone()))
        };

        for topic in topics {
            bus.on(*topic, listener.clone()).unwrap();
        }
    }

    pub fn events(&self) -> Vec<(Event, InstanceId)> {
        self.seen
            .borrow()
            .iter()
            .map(|notification| (notification.event, notification.id.clone()))
            .collect()
    }
}
