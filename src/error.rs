//! Error types for the streaming engine.
//!
//! None of these are fatal to the process.  Decode failures drop a single
//! message, connection failures end a single source, and persistence
//! failures are logged while the in-memory aggregate stays authoritative.

use thiserror::Error;

/// A single inbound payload could not be turned into a [`Record`](crate::source::Record).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not well-formed JSON, or not a JSON object.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is absent or null.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// `collectedAt` is present but is not a point in time.
    #[error("invalid collectedAt timestamp {value:?}")]
    InvalidTimestamp {
        /// The raw value that failed to parse.
        value: String,
    },
}

/// A stream source could not connect, or its connection dropped.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The HTTP request itself failed (DNS, refused, TLS, ...).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The body stream broke after the connection was established.
    #[error("stream interrupted: {0}")]
    Interrupted(#[source] reqwest::Error),

    /// The provider answered, but not with an event stream.
    #[error("{url} answered with content type {content_type:?}, expected text/event-stream")]
    NotEventStream { url: String, content_type: String },

    /// An event kept growing without being terminated.
    #[error("event exceeded {limit} bytes without completing")]
    EventTooLarge { limit: usize },
}

/// The persistent aggregate store could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents could not be (de)serialised: {0}")]
    Serde(#[from] serde_json::Error),
}
