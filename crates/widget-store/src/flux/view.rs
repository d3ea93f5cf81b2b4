use std::cell::RefCell;
use std::rc::Rc;

use super::action::{Action, ActionEnvelope, ComponentKind, InstanceId, QueryParams, RequestData};
use super::dispatcher::ActionQueue;
use super::notify::{Event, Listener, Notification, NotificationBus};
use super::store::Store;
use crate::StoreError;
use crate::widget::Definition;

/// A Flux view that works with a specific [Store].
pub trait View<S: Store> {
    /// Updates the [View] according to the latest changes of the instance in the [Store].
    fn on_update(&mut self, store: &S, id: &InstanceId, event: Event) -> anyhow::Result<()>;
}

/// The ability to request and release the data of a widget instance.
pub trait DataFetching {
    fn component(&self) -> ComponentKind;

    fn instance_id(&self) -> &InstanceId;

    /// The action that creates the instance (if needed) and loads its data.
    fn request_action(&self) -> ActionEnvelope;

    /// The action that removes the instance from its store.
    fn destroy_action(&self) -> ActionEnvelope {
        ActionEnvelope::new(self.component(), self.instance_id().clone(), Action::DestroyInstance)
    }
}

/// The ability to subscribe to the notifications of a widget instance.
pub trait EventSubscribing {
    /// The instance whose topics are subscribed to.
    fn subscribed_id(&self) -> &InstanceId;

    /// The listener used for both subscribing and unsubscribing.
    fn listener(&self) -> &Listener;

    /// Subscribes to the instance-scoped `change` and `fail` topics.
    fn subscribe(&self, bus: &mut NotificationBus) -> Result<(), StoreError> {
        for event in [Event::Change, Event::Fail] {
            bus.on(event.scoped_topic(self.subscribed_id()), self.listener().clone())?;
        }
        Ok(())
    }

    /// Removes the listener added by [EventSubscribing::subscribe].
    fn unsubscribe(&self, bus: &mut NotificationBus) {
        for event in [Event::Change, Event::Fail] {
            bus.remove_listener(&event.scoped_topic(self.subscribed_id()), self.listener());
        }
    }
}

/// Drives the store-facing lifecycle of one widget instance.
///
/// Mounting subscribes and posts the request; unmounting unsubscribes with the very same listener and posts the
/// destroy. Both actions go through an [ActionQueue], so they are only dispatched after the dispatch cycle that is
/// currently in progress.
pub struct WidgetController {
    id: InstanceId,
    definition: Definition,
    params: QueryParams,
    listener: Listener,
    /// The latest notification that wasn't consumed by [WidgetController::sync] yet.
    pending_event: Rc<RefCell<Option<Event>>>,
    mounted: bool,
}

impl WidgetController {
    pub fn new(id: impl Into<InstanceId>, definition: impl Into<Definition>) -> Self {
        let pending_event = Rc::new(RefCell::new(None));
        let listener: Listener = {
            let pending_event = pending_event.clone();
            Rc::new(move |notification: &Notification| {
                pending_event.borrow_mut().replace(notification.event);
            })
        };

        WidgetController {
            id: id.into(),
            definition: definition.into(),
            params: QueryParams::new(),
            listener,
            pending_event,
            mounted: false,
        }
    }

    /// Sets the filter parameters sent with every request.
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Subscribes to the instance's notifications and schedules the data request.
    pub fn mount(&mut self, bus: &mut NotificationBus, queue: &ActionQueue) -> Result<(), StoreError> {
        if self.mounted {
            return Ok(());
        }

        self.subscribe(bus)?;
        queue.post(self.request_action());
        self.mounted = true;
        Ok(())
    }

    /// Unsubscribes from the instance's notifications and schedules its destruction.
    pub fn unmount(&mut self, bus: &mut NotificationBus, queue: &ActionQueue) {
        if !self.mounted {
            return;
        }

        self.unsubscribe(bus);
        queue.post(self.destroy_action());
        self.mounted = false;
    }

    /// Takes the latest unconsumed notification.
    pub fn take_event(&self) -> Option<Event> {
        self.pending_event.borrow_mut().take()
    }

    /// Calls [View::on_update] if the instance was updated since the last call.
    ///
    /// Returns `true` if the view was updated.
    pub fn sync<S: Store, V: View<S>>(&self, store: &S, view: &mut V) -> anyhow::Result<bool> {
        let Some(event) = self.take_event() else {
            return Ok(false);
        };

        view.on_update(store, &self.id, event)?;
        Ok(true)
    }
}

impl DataFetching for WidgetController {
    fn component(&self) -> ComponentKind {
        self.definition.component()
    }

    fn instance_id(&self) -> &InstanceId {
        &self.id
    }

    fn request_action(&self) -> ActionEnvelope {
        ActionEnvelope::new(
            self.component(),
            self.id.clone(),
            Action::RequestData(RequestData {
                definition: Some(self.definition.clone()),
                params: self.params.clone(),
            }),
        )
    }
}

impl EventSubscribing for WidgetController {
    fn subscribed_id(&self) -> &InstanceId {
        &self.id
    }

    fn listener(&self) -> &Listener {
        &self.listener
    }
}
