use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use anyhow::Context;

use super::action::{Action, ActionEnvelope, ComponentKind, InstanceId};
use super::store::Store;
use crate::fetch::{FetchCompletion, FetchOutcome, Responder};

/// A FIFO of actions waiting to be dispatched.
///
/// Cloning it is cheap, and every clone posts into the same queue. Views use it to post actions
/// that must only be dispatched after the current dispatch cycle completes.
#[derive(Clone, Default)]
pub struct ActionQueue {
    actions: Rc<RefCell<VecDeque<ActionEnvelope>>>,
}

impl ActionQueue {
    /// Schedules the action for the next dispatch cycle.
    pub fn post(&self, action: ActionEnvelope) {
        self.actions.borrow_mut().push_back(action);
    }

    pub fn len(&self) -> usize {
        self.actions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.borrow().is_empty()
    }

    fn pop(&self) -> Option<ActionEnvelope> {
        self.actions.borrow_mut().pop_front()
    }
}

/// What a [Store] can do while handling an action besides mutating itself.
pub struct DispatchContext<'a> {
    queue: &'a ActionQueue,
    completions: &'a Sender<FetchCompletion>,
    in_flight: &'a mut usize,
}

impl DispatchContext<'_> {
    /// Posts an action that will be dispatched once the current one was delivered to every store.
    pub fn defer(&self, action: ActionEnvelope) {
        self.queue.post(action);
    }

    /// Creates a [Responder] whose outcome will be dispatched back to the store as
    /// [Action::ReceiveData] or [Action::RequestFailed].
    pub fn responder(&mut self, component: ComponentKind, id: InstanceId, ticket: u64) -> Responder {
        *self.in_flight += 1;
        Responder::new(component, id, ticket, self.completions.clone())
    }
}

/// A typed reference to a [Store] registered with a [Dispatcher].
pub struct StoreHandle<S> {
    index: usize,
    _store: PhantomData<fn() -> S>,
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for StoreHandle<S> {}

/// A Flux Dispatcher.
///
/// Delivers every action to each registered store, in registration order, one action at a time.
pub struct Dispatcher {
    stores: Vec<Box<dyn Store>>,
    queue: ActionQueue,
    completions_tx: Sender<FetchCompletion>,
    completions_rx: Receiver<FetchCompletion>,
    in_flight: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (completions_tx, completions_rx) = mpsc::channel();
        Dispatcher {
            stores: Vec::new(),
            queue: ActionQueue::default(),
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    /// Registers the [Store]'s handler.
    ///
    /// Returns a handle that gives typed access to the store afterwards.
    pub fn register<S: Store>(&mut self, store: S) -> StoreHandle<S> {
        self.stores.push(Box::new(store));
        StoreHandle {
            index: self.stores.len() - 1,
            _store: PhantomData,
        }
    }

    /// Returns a reference to a registered [Store].
    pub fn store<S: Store>(&self, handle: StoreHandle<S>) -> &S {
        let store: &dyn Store = &*self.stores[handle.index];
        let store: &dyn Any = store;
        store
            .downcast_ref()
            .expect("bug: store handles are only created by the dispatcher they belong to")
    }

    /// Returns a mutable reference to a registered [Store].
    pub fn store_mut<S: Store>(&mut self, handle: StoreHandle<S>) -> &mut S {
        let store: &mut dyn Store = &mut *self.stores[handle.index];
        let store: &mut dyn Any = store;
        store
            .downcast_mut()
            .expect("bug: store handles are only created by the dispatcher they belong to")
    }

    /// Returns the queue that can be used to post actions outside of the dispatch cycle.
    pub fn queue(&self) -> ActionQueue {
        self.queue.clone()
    }

    /// Returns the number of requests that didn't report back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Dispatches the action and everything that was deferred while handling it.
    pub fn dispatch(&mut self, action: ActionEnvelope) -> anyhow::Result<()> {
        self.queue.post(action);
        self.run_pending()
    }

    /// Dispatches every queued action in the order it was posted.
    pub fn run_pending(&mut self) -> anyhow::Result<()> {
        while let Some(action) = self.queue.pop() {
            self.deliver(action)?;
        }
        Ok(())
    }

    /// Dispatches the completions of all finished requests without blocking.
    ///
    /// Returns the number of processed completions.
    pub fn pump(&mut self) -> anyhow::Result<usize> {
        let mut processed = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.complete(completion)?;
            processed += 1;
        }
        self.run_pending()?;
        Ok(processed)
    }

    /// Blocks until at least one request completes or the timeout elapses.
    ///
    /// Returns `false` if nothing completed.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        if self.in_flight == 0 {
            return Ok(false);
        }

        match self.completions_rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.complete(completion)?;
                self.pump()?;
                Ok(true)
            }
            // The sender lives as long as the dispatcher, so this can only be a timeout
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(false),
        }
    }

    /// Processes completions until no requests are in flight.
    ///
    /// Returns `false` if the timeout elapsed first.
    pub fn run_until_idle(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        let deadline = Instant::now() + timeout;
        self.run_pending()?;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!("Gave up waiting for {} request(s)", self.in_flight);
                return Ok(false);
            }
            self.wait_for_completion(remaining)?;
        }
        Ok(true)
    }

    fn deliver(&mut self, envelope: ActionEnvelope) -> anyhow::Result<()> {
        tracing::trace!(
            "Dispatching {} for {} '{}'",
            envelope.action.name(),
            envelope.component,
            envelope.id.as_ref().map(InstanceId::as_str).unwrap_or("*")
        );

        for store in self.stores.iter_mut() {
            if !store.should_handle(envelope.component) {
                continue;
            }

            let mut ctx = DispatchContext {
                queue: &self.queue,
                completions: &self.completions_tx,
                in_flight: &mut self.in_flight,
            };
            store
                .handle(&envelope, &mut ctx)
                .with_context(|| format!("failed to handle the '{}' action", envelope.action.name()))?;
        }

        Ok(())
    }

    fn complete(&mut self, completion: FetchCompletion) -> anyhow::Result<()> {
        self.in_flight = self.in_flight.saturating_sub(1);

        let FetchCompletion {
            component,
            id,
            ticket,
            outcome,
        } = completion;
        let action = match outcome {
            FetchOutcome::Success(payload) => Action::ReceiveData { ticket, payload },
            FetchOutcome::Failure(reason) => Action::RequestFailed { ticket, reason },
            FetchOutcome::Aborted => {
                tracing::trace!("Request #{} for {} '{}' was aborted", ticket, component, id);
                return Ok(());
            }
        };

        self.queue.post(ActionEnvelope::new(component, id, action));
        self.run_pending()
    }
}
