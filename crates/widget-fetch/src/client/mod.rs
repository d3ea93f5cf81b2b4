mod chunk_processor;
mod connection;
mod util;

use std::time::Duration;

use connection::HttpConnection;
use url::{Position, Url};
use util::encode_request;

use crate::{FetchError, Result};

/// Default timeout applied to connecting, writing and reading.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A minimal blocking HTTP/1.1 client that loads JSON documents.
///
/// A new connection is opened for every request and closed afterwards.
#[derive(Debug, Clone)]
pub struct HttpClient {
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        HttpClient::new(DEFAULT_TIMEOUT)
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        HttpClient { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the final request [Url] by appending the query parameters to the provided URL.
    pub fn build_url<'p>(url: &str, params: impl IntoIterator<Item = (&'p str, &'p str)>) -> Result<Url> {
        let mut url = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut params = params.into_iter().peekable();
        if params.peek().is_some() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }

    /// Performs a `GET` request and returns the raw response body.
    ///
    /// Non-2xx responses are reported as [FetchError::Status].
    pub fn get<'p>(&self, url: &str, params: impl IntoIterator<Item = (&'p str, &'p str)>) -> Result<Vec<u8>> {
        let url = Self::build_url(url, params)?;
        if url.scheme() != "http" {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| FetchError::Other(format!("'{url}' doesn't contain a host").into()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| FetchError::Other(format!("failed to determine the port for '{url}'").into()))?;
        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let request = http::Request::builder()
            .uri(&url[Position::BeforePath..])
            .header("host", host_header)
            .header("accept", "application/json")
            .header("connection", "close")
            .header("user-agent", concat!("widget-fetch/", env!("CARGO_PKG_VERSION")))
            .body(Vec::new())
            .map_err(|_| FetchError::Other(format!("failed to construct the request for '{url}'").into()))?;

        let mut buffer = Vec::new();
        encode_request(&request, &mut buffer)?;

        tracing::trace!("Requesting {}", url);
        let mut connection = HttpConnection::connect(host, port, self.timeout)?;
        let status_code = connection.send(&mut buffer)?;
        tracing::trace!("Got {} from {}", status_code, url);

        if !status_code.is_success() {
            return Err(FetchError::Status(status_code));
        }

        Ok(buffer)
    }

    /// Performs a `GET` request and deserializes the response body as JSON.
    pub fn get_json<'p>(
        &self,
        url: &str,
        params: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> Result<serde_json::Value> {
        let body = self.get(url, params)?;
        serde_json::from_slice(&body)
            .map_err(|e| FetchError::from_serde_error_with_description(e, || "response body".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const NO_PARAMS: [(&str, &str); 0] = [];

    /// Serves a single canned response and returns the raw request that was received.
    fn serve_once(response: &'static [u8]) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response).unwrap();
            String::from_utf8(request).unwrap()
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn appends_query_params() {
        let url = HttpClient::build_url("http://localhost/rows?fixed=1", [("term", "a b"), ("page", "2")]).unwrap();
        assert_eq!(url.as_str(), "http://localhost/rows?fixed=1&term=a+b&page=2");
    }

    #[test]
    fn rejects_unsupported_schemes() {
        let err = HttpClient::default().get("https://localhost/rows", NO_PARAMS).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(scheme) if scheme == "https"));
    }

    #[test]
    fn loads_a_fixed_length_json_body() {
        let (base, server) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 17\r\n\r\n[{\"name\":\"acme\"}]");

        let value = HttpClient::default()
            .get_json(&format!("{base}/items"), [("q", "ac")])
            .unwrap();

        assert_eq!(value, json!([{"name": "acme"}]));
        let request = server.join().unwrap();
        assert!(request.starts_with("GET /items?q=ac HTTP/1.1\r\n"), "{request}");
    }

    #[test]
    fn loads_a_chunked_json_body() {
        let (base, server) =
            serve_once(b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n3\r\n[1,\r\n2\r\n2]\r\n0\r\n\r\n");

        let value = HttpClient::default().get_json(&base, NO_PARAMS).unwrap();

        assert_eq!(value, json!([1, 2]));
        server.join().unwrap();
    }

    #[test]
    fn reports_error_statuses() {
        let (base, server) = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");

        let err = HttpClient::default().get_json(&base, NO_PARAMS).unwrap_err();

        assert!(matches!(err, FetchError::Status(code) if code == StatusCode::NOT_FOUND));
        server.join().unwrap();
    }

    #[test]
    fn reports_malformed_json() {
        let (base, server) = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n{no}");

        let err = HttpClient::default().get_json(&base, NO_PARAMS).unwrap_err();

        assert!(matches!(err, FetchError::JsonDeserializationError { .. }));
        server.join().unwrap();
    }
}
