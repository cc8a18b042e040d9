//! Stream sources: one long-lived connection per provider.
//!
//! This module defines the [`StreamProvider`] trait, the events a source
//! reports to the aggregator, and [`open`], which runs one provider
//! connection on its own task.  The shared [`Record`] type and its decoder
//! live in sub-modules, and [`sse`] holds the HTTP event-stream provider.
//!
//! ## For contributors — adding a new provider kind
//!
//! 1. Create a new file in this directory.
//! 2. Implement [`StreamProvider`] for your struct; `connect` returns a
//!    stream of raw payload strings.
//! 3. Re-export it below and construct it in `main.rs`.
//!
//! Decoding, ordering, completion and persistence are provider-agnostic.

pub mod decode;
mod record;
pub mod sse;

pub use record::{insertion_index, Record};
pub use sse::SseProvider;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::ConnectionError;

/// Raw payloads as they arrive from a provider, one per inbound event.
pub type PayloadStream = BoxStream<'static, Result<String, ConnectionError>>;

/// Query sent to a provider when its stream is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Search domain (e.g. "AI"); may be empty.
    pub domain: String,
    /// Location filter; may be empty.
    pub location: String,
    /// Result-count hint.  Providers may send more or fewer.
    pub count: u32,
}

/// Anything that can open a streaming connection to one provider.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Provider id, used in logs and in the endpoint path.
    fn name(&self) -> &str;

    /// Establish the connection.  Errors here end the source as `Failed`.
    async fn connect(&self, query: &QueryParams) -> Result<PayloadStream, ConnectionError>;
}

/// Identifies one collection session.  Ids increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a source within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub usize);

/// Lifecycle of one stream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl SourceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SourceState::Closed | SourceState::Failed)
    }
}

/// Something a source reports to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEventKind {
    /// The connection is established.
    Opened,
    /// One inbound payload, not yet decoded.
    Message(String),
    /// The stream ended or was cancelled.  Terminal.
    Closed,
    /// The connection could not be established or dropped.  Terminal.
    Failed(String),
}

/// A source event tagged with the session and source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    pub session: SessionId,
    pub source: SourceId,
    pub kind: SourceEventKind,
}

/// Owner's handle on a running source.  Dropping it closes the source.
#[derive(Debug)]
pub struct SourceHandle {
    cancel: Option<oneshot::Sender<()>>,
}

impl SourceHandle {
    /// Cancel the source.  It reports `Closed` (unless it already reported a
    /// terminal event) and releases its connection.  Idempotent.
    pub fn close(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Spawn a task that connects `provider` and forwards its events to
/// `events`, tagged with `session` and `source`.
///
/// Exactly one terminal event is sent per source, after which the task
/// exits.  Must be called from inside a tokio runtime.
pub fn open(
    session: SessionId,
    source: SourceId,
    provider: Arc<dyn StreamProvider>,
    query: QueryParams,
    events: mpsc::UnboundedSender<SourceEvent>,
) -> SourceHandle {
    let (cancel_tx, cancel_rx) = oneshot::channel();

    tokio::spawn(async move {
        let emit = |kind| events.send(SourceEvent { session, source, kind }).is_ok();
        let terminal = pump(provider.as_ref(), &query, cancel_rx, &emit).await;
        match &terminal {
            SourceEventKind::Failed(reason) => {
                warn!(provider = provider.name(), %session, %reason, "stream failed")
            }
            _ => info!(provider = provider.name(), %session, "stream closed"),
        }
        emit(terminal);
    });

    SourceHandle {
        cancel: Some(cancel_tx),
    }
}

/// Drive one connection until it ends, returning the terminal event.
async fn pump(
    provider: &dyn StreamProvider,
    query: &QueryParams,
    mut cancel: oneshot::Receiver<()>,
    emit: &impl Fn(SourceEventKind) -> bool,
) -> SourceEventKind {
    // A dropped handle resolves `cancel` too, which is also a close.
    let mut stream = tokio::select! {
        biased;
        _ = &mut cancel => return SourceEventKind::Closed,
        connected = provider.connect(query) => match connected {
            Ok(stream) => stream,
            Err(e) => return SourceEventKind::Failed(e.to_string()),
        },
    };

    debug!(provider = provider.name(), "stream open");
    if !emit(SourceEventKind::Opened) {
        return SourceEventKind::Closed;
    }

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => return SourceEventKind::Closed,
            next = stream.next() => match next {
                Some(Ok(payload)) => {
                    // Receiver gone: the aggregator has shut down.
                    if !emit(SourceEventKind::Message(payload)) {
                        return SourceEventKind::Closed;
                    }
                }
                Some(Err(e)) => return SourceEventKind::Failed(e.to_string()),
                None => return SourceEventKind::Closed,
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedProvider};
    use super::*;

    async fn collect(mut rx: mpsc::UnboundedReceiver<SourceEvent>) -> Vec<SourceEventKind> {
        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.session, SessionId(7));
            assert_eq!(event.source, SourceId(1));
            let terminal = matches!(event.kind, SourceEventKind::Closed | SourceEventKind::Failed(_));
            kinds.push(event.kind);
            if terminal {
                break;
            }
        }
        kinds
    }

    #[tokio::test]
    async fn forwards_messages_then_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = ScriptedProvider::new("a", Script::Emit(vec!["one".into(), "two".into()]));
        let _handle = open(SessionId(7), SourceId(1), provider, QueryParams::default(), tx);

        assert_eq!(
            collect(rx).await,
            vec![
                SourceEventKind::Opened,
                SourceEventKind::Message("one".into()),
                SourceEventKind::Message("two".into()),
                SourceEventKind::Closed,
            ]
        );
    }

    #[tokio::test]
    async fn refused_connection_fails_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = ScriptedProvider::new("a", Script::Refuse);
        let _handle = open(SessionId(7), SourceId(1), provider, QueryParams::default(), tx);

        let kinds = collect(rx).await;
        assert_eq!(kinds.len(), 1);
        assert!(matches!(kinds[0], SourceEventKind::Failed(_)));
    }

    #[tokio::test]
    async fn dropped_connection_is_failed_after_messages() {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = ScriptedProvider::new("a", Script::EmitThenDrop(vec!["one".into()]));
        let _handle = open(SessionId(7), SourceId(1), provider, QueryParams::default(), tx);

        let kinds = collect(rx).await;
        assert_eq!(kinds[1], SourceEventKind::Message("one".into()));
        assert!(matches!(kinds[2], SourceEventKind::Failed(_)));
    }

    #[tokio::test]
    async fn close_ends_a_hanging_stream_exactly_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = ScriptedProvider::new("a", Script::EmitThenHang(vec!["one".into()]));
        let mut handle = open(SessionId(7), SourceId(1), provider, QueryParams::default(), tx);

        assert_eq!(rx.recv().await.unwrap().kind, SourceEventKind::Opened);
        assert_eq!(rx.recv().await.unwrap().kind, SourceEventKind::Message("one".into()));

        handle.close();
        handle.close();

        assert_eq!(rx.recv().await.unwrap().kind, SourceEventKind::Closed);
        // The task has exited and dropped its sender.
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(!SourceState::Connecting.is_terminal());
        assert!(!SourceState::Open.is_terminal());
        assert!(SourceState::Closed.is_terminal());
        assert!(SourceState::Failed.is_terminal());
    }
}
