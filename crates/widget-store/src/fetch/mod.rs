mod http;
#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

pub use http::HttpRequestHandler;
use serde_json::Value;

use crate::flux::{ComponentKind, InstanceId, QueryParams};

/// A single data request issued by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub params: QueryParams,
}

/// The result of a [FetchRequest].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Value),
    /// Network errors, timeouts and malformed payloads all end up here.
    Failure(String),
    /// The request was cancelled through its [RequestHandle].
    Aborted,
}

/// A routed [FetchOutcome] that is sent back to the [crate::flux::Dispatcher].
#[derive(Debug)]
pub struct FetchCompletion {
    pub component: ComponentKind,
    pub id: InstanceId,
    pub ticket: u64,
    pub outcome: FetchOutcome,
}

/// A handle that can be used to cancel an in-flight request.
#[derive(Debug, Clone, Default)]
pub struct RequestHandle {
    cancelled: Arc<AtomicBool>,
}

impl RequestHandle {
    pub fn abort(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Reports the outcome of one request back to the dispatcher.
///
/// Exactly one [FetchCompletion] is sent per responder: dropping it without responding reports a failure,
/// and any response after the request was aborted is reported as [FetchOutcome::Aborted].
#[derive(Debug)]
pub struct Responder {
    component: ComponentKind,
    id: InstanceId,
    ticket: u64,
    sender: Sender<FetchCompletion>,
    handle: RequestHandle,
    responded: bool,
}

impl Responder {
    pub(crate) fn new(component: ComponentKind, id: InstanceId, ticket: u64, sender: Sender<FetchCompletion>) -> Self {
        Responder {
            component,
            id,
            ticket,
            sender,
            handle: RequestHandle::default(),
            responded: false,
        }
    }

    /// Returns a [RequestHandle] that can cancel this request.
    pub fn handle(&self) -> RequestHandle {
        self.handle.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }

    pub fn succeed(mut self, data: Value) {
        self.respond(FetchOutcome::Success(data));
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.respond(FetchOutcome::Failure(reason.into()));
    }

    fn respond(&mut self, outcome: FetchOutcome) {
        self.responded = true;

        let outcome = if self.is_cancelled() { FetchOutcome::Aborted } else { outcome };
        let completion = FetchCompletion {
            component: self.component,
            id: self.id.clone(),
            ticket: self.ticket,
            outcome,
        };

        if self.sender.send(completion).is_err() {
            tracing::debug!(
                "Dropping the response for {} '{}': the dispatcher is gone",
                self.component,
                self.id
            );
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if !self.responded {
            self.respond(FetchOutcome::Failure("the request was dropped without a response".into()));
        }
    }
}

/// Issues asynchronous data requests on behalf of the stores.
pub trait RequestHandler {
    /// Starts the request and returns immediately.
    ///
    /// The outcome must be reported through the provided [Responder], possibly from another thread.
    fn request(&self, request: FetchRequest, responder: Responder) -> RequestHandle;
}

/// An in-flight request that a record is waiting for.
#[derive(Debug)]
struct PendingRequest {
    ticket: u64,
    handle: RequestHandle,
}

/// A record that loads its data through a [RequestSlot].
pub(crate) trait Fetching {
    fn requests(&mut self) -> &mut RequestSlot;
}

/// Tracks the latest request of a record so that only its completion is accepted.
#[derive(Debug, Default)]
pub(crate) struct RequestSlot {
    pending: Option<PendingRequest>,
}

impl RequestSlot {
    /// Starts waiting for a new request, aborting the one it supersedes.
    pub fn replace(&mut self, ticket: u64, handle: RequestHandle) {
        if let Some(superseded) = self.pending.replace(PendingRequest { ticket, handle }) {
            tracing::trace!("Request #{} was superseded by #{}", superseded.ticket, ticket);
            superseded.handle.abort();
        }
    }

    /// Stops waiting if the ticket belongs to the latest request.
    ///
    /// Returns `false` for stale tickets.
    pub fn settle(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Aborts the pending request, if any.
    pub fn abort(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }
}
