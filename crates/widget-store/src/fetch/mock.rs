use std::cell::RefCell;

use serde_json::Value;

use super::{FetchRequest, RequestHandle, RequestHandler, Responder};

/// A [RequestHandler] that records requests and lets tests decide how they complete.
#[derive(Default)]
pub struct MockRequestHandler {
    requests: RefCell<Vec<(FetchRequest, Option<Responder>)>>,
}

impl MockRequestHandler {
    /// Returns every request issued so far.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.borrow().iter().map(|(request, _)| request.clone()).collect()
    }

    /// Returns the number of requests that weren't completed yet.
    pub fn unanswered(&self) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|(_, responder)| responder.is_some())
            .count()
    }

    pub fn resolve(&self, index: usize, data: Value) {
        self.take_responder(index).succeed(data);
    }

    pub fn reject(&self, index: usize) {
        self.take_responder(index).fail("mock failure");
    }

    fn take_responder(&self, index: usize) -> Responder {
        self.requests.borrow_mut()[index]
            .1
            .take()
            .expect("the request was already completed")
    }
}

impl RequestHandler for MockRequestHandler {
    fn request(&self, request: FetchRequest, responder: Responder) -> RequestHandle {
        let handle = responder.handle();
        self.requests.borrow_mut().push((request, Some(responder)));
        handle
    }
}
