use std::thread;

use widget_fetch::HttpClient;

use super::{FetchRequest, RequestHandle, RequestHandler, Responder};

/// A [RequestHandler] that performs every request on its own background thread using [HttpClient].
///
/// Timeouts are reported through the same failure path as any other error.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestHandler {
    client: HttpClient,
}

impl HttpRequestHandler {
    pub fn new(client: HttpClient) -> Self {
        HttpRequestHandler { client }
    }
}

impl RequestHandler for HttpRequestHandler {
    fn request(&self, request: FetchRequest, responder: Responder) -> RequestHandle {
        let handle = responder.handle();
        let client = self.client.clone();

        let spawned = thread::Builder::new()
            .name("widget-fetch".to_string())
            .spawn(move || {
                if responder.is_cancelled() {
                    // Reported as aborted when dropped
                    return;
                }

                let params = request.params.iter().map(|(key, value)| (key.as_str(), value.as_str()));
                match client.get_json(&request.url, params) {
                    Ok(data) => responder.succeed(data),
                    Err(e) => {
                        tracing::debug!("Request to '{}' failed: {}", request.url, e);
                        let reason = anyhow::Error::from(e);
                        responder.fail(format!("{reason:#}"));
                    }
                }
            });

        // The responder is dropped together with the closure, which reports a failure
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn a request thread: {}", e);
        }

        handle
    }
}
