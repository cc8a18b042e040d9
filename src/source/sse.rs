//! Server-sent-events provider.
//!
//! Each scraper backend exposes `GET {base}/api/scraper/stream/{provider}`
//! answering with a `text/event-stream` body.  Every event's `data` is one
//! JSON record; the stream ends when the server closes the connection.
//!
//! Framing is done by [`SseFramer`], a pure incremental parser, so tests
//! can exercise it without a network.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::{PayloadStream, QueryParams, StreamProvider};
use crate::error::ConnectionError;

/// A provider reached over HTTP as an event stream.
pub struct SseProvider {
    /// Base URL of the scraper API, without a trailing slash.
    pub base_url: String,
    /// Provider id, used as the last path segment (e.g. `mlh`).
    pub provider: String,
    client: reqwest::Client,
}

impl SseProvider {
    /// Create a provider.
    ///
    /// * `base_url` — e.g. `http://localhost:8080`.
    /// * `provider` — e.g. `devpost`.
    /// * `client` — shared between providers; it pools connections.
    pub fn new(base_url: impl Into<String>, provider: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider: provider.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/scraper/stream/{}", self.base_url, self.provider)
    }
}

#[async_trait]
impl StreamProvider for SseProvider {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn connect(&self, query: &QueryParams) -> Result<PayloadStream, ConnectionError> {
        let url = self.endpoint();
        let response = self
            .client
            .get(&url)
            .query(&[("domain", query.domain.as_str()), ("location", query.location.as_str())])
            .query(&[("count", query.count)])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| ConnectionError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::Status { url, status });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with("text/event-stream") {
            return Err(ConnectionError::NotEventStream {
                content_type: content_type.to_string(),
                url,
            });
        }

        let mut framer = SseFramer::default();
        let payloads = response.bytes_stream().flat_map(move |chunk| {
            let framed = chunk
                .map_err(ConnectionError::Interrupted)
                .and_then(|bytes| framer.push(&bytes));
            let items: Vec<Result<String, ConnectionError>> = match framed {
                Ok(events) => events.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        });

        Ok(payloads.boxed())
    }
}

/// Most bytes a single event may buffer before the stream is abandoned.
pub const MAX_EVENT_BYTES: usize = 1 << 20;

/// Incremental `text/event-stream` parser yielding each event's data.
///
/// Only the `data` field matters here: `event`, `id` and `retry` are
/// ignored, `:` lines are comments.  LF and CRLF line endings are accepted.
/// Bytes are buffered until a full line arrives, so UTF-8 sequences split
/// across chunks decode correctly.  An event that grows past
/// [`MAX_EVENT_BYTES`] without completing is an error.
#[derive(Debug, Default)]
pub struct SseFramer {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseFramer {
    /// Feed one chunk of the body, returning every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ConnectionError> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(event) = self.line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }

        let buffered = self.pending.len() + self.data.iter().map(String::len).sum::<usize>();
        if buffered > MAX_EVENT_BYTES {
            self.pending.clear();
            self.data.clear();
            return Err(ConnectionError::EventTooLarge {
                limit: MAX_EVENT_BYTES,
            });
        }
        Ok(events)
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            let data = self.data.join("\n");
            self.data.clear();
            return (!data.is_empty()).then_some(data);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
