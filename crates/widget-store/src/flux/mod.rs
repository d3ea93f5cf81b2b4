//! The unidirectional data flow plumbing shared by every widget family.
//!
//! Views post [ActionEnvelopes](ActionEnvelope), the [Dispatcher] delivers them to every applicable
//! [Store], stores update their [Registry] and emit [Notifications](Notification) on their [NotificationBus].

mod action;
mod dispatcher;
mod notify;
mod registry;
mod store;
mod view;

pub use action::{Action, ActionEnvelope, ComponentKind, Direction, InstanceId, QueryParams, RequestData};
pub use dispatcher::{ActionQueue, DispatchContext, Dispatcher, StoreHandle};
pub use notify::{Event, Listener, Notification, NotificationBus};
pub use registry::Registry;
pub use store::{ComponentTags, Store};
pub use view::{DataFetching, EventSubscribing, View, WidgetController};
