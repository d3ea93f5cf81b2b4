use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use http::StatusCode;
use httparse::{EMPTY_HEADER, Header, Status};

use super::chunk_processor::ChunkProcessor;
use crate::{FetchError, Result};

const MAX_RESPONSE_HEADERS: usize = 32;

pub struct HttpConnection {
    stream: TcpStream,
}

enum BodyParsingMode {
    Chunks(ChunkProcessor),
    FixedLength(usize),
    /// No framing headers: the body ends when the server closes the connection.
    UntilClose,
}

impl BodyParsingMode {
    /// Picks the body framing based on the response headers.
    fn from_headers(headers: &[Header<'_>]) -> Result<Self> {
        if let Some(transfer_encoding) = find_header(headers, "Transfer-Encoding") {
            let value = std::str::from_utf8(transfer_encoding.value)
                .map_err(|_| FetchError::Other("invalid transfer-encoding header value".into()))?;
            if value.to_ascii_lowercase().contains("chunked") {
                return Ok(BodyParsingMode::Chunks(ChunkProcessor::new()));
            }
        }

        if let Some(content_length) = find_header(headers, "Content-Length") {
            let raw_content_length = std::str::from_utf8(content_length.value)
                .map_err(|_| FetchError::Other("invalid content-length header value".into()))?;
            let content_length = raw_content_length
                .trim()
                .parse::<usize>()
                .map_err(|_| FetchError::Other("failed to parse content-length as a number".into()))?;
            return Ok(BodyParsingMode::FixedLength(content_length));
        }

        Ok(BodyParsingMode::UntilClose)
    }

    /// Appends the body bytes from `src` to `dst`.
    ///
    /// Returns `true` once the whole body was received.
    fn feed(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool> {
        match self {
            BodyParsingMode::Chunks(processor) => Ok(!processor.process_available_data(src, dst)?),
            BodyParsingMode::FixedLength(body_length) => {
                let missing = body_length.saturating_sub(dst.len());
                dst.extend_from_slice(&src[..missing.min(src.len())]);
                Ok(dst.len() >= *body_length)
            }
            BodyParsingMode::UntilClose => {
                dst.extend_from_slice(src);
                Ok(false)
            }
        }
    }
}

fn find_header<'a, 'b>(headers: &'a [Header<'b>], name: &str) -> Option<&'a Header<'b>> {
    headers.iter().find(|header| header.name.eq_ignore_ascii_case(name))
}

impl HttpConnection {
    /// Connects to the provided host, applying the timeout to the connect, read and write operations.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addrs = (host, port).to_socket_addrs().map_err(|e| {
            FetchError::from_io_error_with_description(e, || format!("failed to resolve '{host}:{port}'").into())
        })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    let set_timeouts = stream
                        .set_read_timeout(Some(timeout))
                        .and_then(|_| stream.set_write_timeout(Some(timeout)));
                    set_timeouts.map_err(|e| {
                        FetchError::from_io_error_with_description(e, || "failed to configure socket timeouts".into())
                    })?;
                    return Ok(HttpConnection { stream });
                }
                Err(e) => {
                    tracing::trace!("Failed to connect to {}: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => FetchError::from_io_error_with_description(e, || {
                format!("failed to connect to '{host}:{port}'").into()
            }),
            None => FetchError::Other(format!("'{host}' did not resolve to any address").into()),
        })
    }

    /// Sends an encoded request from the provided buffer and then reuses the same buffer to store the response body.
    pub fn send(&mut self, buf: &mut Vec<u8>) -> Result<StatusCode> {
        self.stream.write_all(buf).map_err(|e| {
            FetchError::from_io_error_with_description(e, || "failed to write the request to the socket".into())
        })?;

        buf.clear();

        let mut temp_buf = [0u8; 4096];
        let mut head = Vec::new();

        let (status_code, mut body_parsing_mode, body_start_idx) = loop {
            let filled_bytes = self.read(&mut temp_buf)?;
            if filled_bytes == 0 {
                return Err(FetchError::Other(
                    "connection closed before the response head was received".into(),
                ));
            }
            head.extend_from_slice(&temp_buf[..filled_bytes]);

            let mut headers = [EMPTY_HEADER; MAX_RESPONSE_HEADERS];
            let mut response = httparse::Response::new(&mut headers);
            match response.parse(&head) {
                Ok(Status::Complete(body_start_idx)) => {
                    let code = response
                        .code
                        .ok_or_else(|| FetchError::Other("parsed an HTTP response without a code".into()))?;
                    let status_code = StatusCode::from_u16(code)
                        .map_err(|_| FetchError::Other("got an invalid HTTP response code".into()))?;
                    let body_parsing_mode = BodyParsingMode::from_headers(response.headers)?;
                    break (status_code, body_parsing_mode, body_start_idx);
                }
                Ok(Status::Partial) => continue,
                Err(_) => return Err(FetchError::Other("failed to parse an HTTP response".into())),
            }
        };

        let mut is_done = body_parsing_mode.feed(&head[body_start_idx..], buf)?;
        while !is_done {
            let filled_bytes = self.read(&mut temp_buf)?;
            if filled_bytes == 0 {
                if matches!(body_parsing_mode, BodyParsingMode::UntilClose) {
                    break;
                }
                return Err(FetchError::Other(
                    "connection closed before the response body was received".into(),
                ));
            }
            is_done = body_parsing_mode.feed(&temp_buf[..filled_bytes], buf)?;
        }

        Ok(status_code)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream
            .read(buf)
            .map_err(|e| FetchError::from_io_error_with_description(e, || "failed to read an HTTP response".into()))
    }
}
