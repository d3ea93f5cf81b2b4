use std::borrow::Cow;

use thiserror::Error;

mod client;

pub use client::{DEFAULT_TIMEOUT, HttpClient};
pub use http::StatusCode;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to parse the '{url}' URL")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme '{0}', only plain http is supported")]
    UnsupportedScheme(String),
    #[error("failed to perform an I/O operation: {description}")]
    IoError {
        description: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },
    #[error("the request timed out: {description}")]
    TimedOut { description: Cow<'static, str> },
    #[error("server responded with {0}")]
    Status(StatusCode),
    #[error("failed to deserialize a JSON {description}")]
    JsonDeserializationError {
        description: Cow<'static, str>,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Other(Cow<'static, str>),
}

impl FetchError {
    /// Maps an [std::io::Error] into either [FetchError::TimedOut] or [FetchError::IoError].
    fn from_io_error_with_description(
        source: std::io::Error,
        description: impl Fn() -> Cow<'static, str>,
    ) -> FetchError {
        match source.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => FetchError::TimedOut {
                description: description(),
            },
            _ => FetchError::IoError {
                description: description(),
                source,
            },
        }
    }

    fn from_serde_error_with_description(
        source: serde_json::Error,
        description: impl Fn() -> Cow<'static, str>,
    ) -> FetchError {
        FetchError::JsonDeserializationError {
            description: description(),
            source,
        }
    }

    /// Returns true if this error was caused by a connect/read/write timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::TimedOut { .. })
    }
}
