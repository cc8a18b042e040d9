//! The aggregator: one owner for the merged result list.
//!
//! Every stream source reports to the aggregator over a single channel, so
//! merging, persisting and completion tracking all happen on one task and
//! never run concurrently with themselves.  The UI talks to it with
//! [`Command`]s and receives an [`Update`] after every visible change.
//!
//! ```text
//!  source task ─┐ SourceEvent          Update
//!  source task ─┼──────────► Aggregator ──────► App (projector)
//!               │               ▲
//!               │   Command     │
//!               └─────── input ─┘
//! ```
//!
//! Each search opens a new session with a fresh [`SessionId`].  Sources tag
//! their events with the session that opened them; events from any other
//! session are discarded.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::source::{
    self, decode::decode, insertion_index, QueryParams, Record, SessionId, SourceEvent,
    SourceEventKind, SourceHandle, SourceId, SourceState, StreamProvider,
};
use crate::store::AggregateStore;

/// Which listing kind a search asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrapeKind {
    /// Streamed from every configured provider.
    #[default]
    Hackathons,
    /// Served by a synchronous collaborator outside this engine.
    Certificates,
}

/// Search parameters as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub kind: ScrapeKind,
    pub domain: String,
    pub location: String,
    pub count: u32,
}

impl SearchParams {
    /// Query sent to each provider.  Every provider currently takes the same
    /// parameters.
    pub fn query(&self) -> QueryParams {
        QueryParams {
            domain: self.domain.trim().to_string(),
            location: self.location.trim().to_string(),
            count: self.count,
        }
    }
}

/// Collection status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No session is running.
    Idle,
    /// At least one source of the current session is still open.
    Collecting,
    /// Every source of the current session has terminated.
    Completed,
}

/// Snapshot published to the projector after each visible change.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Session the snapshot belongs to; `None` before the first search.
    pub session: Option<SessionId>,
    /// The aggregate, newest first.
    pub records: Vec<Record>,
    pub status: Status,
    /// Sources opened by the session.
    pub sources: usize,
    /// Sources of the session that ended in `Failed`.
    pub failed_sources: usize,
}

/// Requests from the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(SearchParams),
    Shutdown,
}

struct Slot {
    provider: String,
    state: SourceState,
    handle: SourceHandle,
}

struct Session {
    id: SessionId,
    sources: Vec<Slot>,
    completed: bool,
}

impl Session {
    fn failed(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.state == SourceState::Failed)
            .count()
    }
}

pub struct Aggregator {
    providers: Vec<Arc<dyn StreamProvider>>,
    store: Box<dyn AggregateStore>,
    events: mpsc::UnboundedSender<SourceEvent>,
    records: Vec<Record>,
    status: Status,
    session: Option<Session>,
    last_session: u64,
}

impl Aggregator {
    /// Create an aggregator seeded from `store`.
    ///
    /// Returns the receiving end of the source-event channel, which must be
    /// handed to [`Aggregator::run`] (or drained by the caller).
    pub fn new(
        providers: Vec<Arc<dyn StreamProvider>>,
        store: Box<dyn AggregateStore>,
    ) -> (Self, mpsc::UnboundedReceiver<SourceEvent>) {
        let records = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not load stored aggregate, starting empty");
            Vec::new()
        });
        let (events, events_rx) = mpsc::unbounded_channel();

        let aggregator = Self {
            providers,
            store,
            events,
            records,
            status: Status::Idle,
            session: None,
            last_session: 0,
        };
        (aggregator, events_rx)
    }

    /// The live aggregate, newest first.
    pub fn current_aggregate(&self) -> &[Record] {
        &self.records
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn snapshot(&self) -> Update {
        Update {
            session: self.session_id(),
            records: self.records.clone(),
            status: self.status,
            sources: self.session.as_ref().map_or(0, |s| s.sources.len()),
            failed_sources: self.session.as_ref().map_or(0, Session::failed),
        }
    }

    /// Route a search by kind.  Only hackathon searches open streams.
    pub fn search(&mut self, params: &SearchParams) -> Update {
        match params.kind {
            ScrapeKind::Hackathons => self.start_session(params),
            ScrapeKind::Certificates => {
                self.supersede();
                self.records.clear();
                self.status = Status::Idle;
                info!("certificate listings are not streamed; nothing to collect");
                self.snapshot()
            }
        }
    }

    /// Start a new collection session, superseding any running one.
    ///
    /// The aggregate is reset to empty and one source is opened per
    /// configured provider.  Must be called from inside a tokio runtime.
    pub fn start_session(&mut self, params: &SearchParams) -> Update {
        self.supersede();

        self.last_session += 1;
        let id = SessionId(self.last_session);
        self.records.clear();
        self.status = Status::Collecting;

        let query = params.query();
        let sources: Vec<Slot> = self
            .providers
            .iter()
            .enumerate()
            .map(|(index, provider)| Slot {
                provider: provider.name().to_string(),
                state: SourceState::Connecting,
                handle: source::open(
                    id,
                    SourceId(index),
                    Arc::clone(provider),
                    query.clone(),
                    self.events.clone(),
                ),
            })
            .collect();

        info!(
            session = %id,
            sources = sources.len(),
            domain = %query.domain,
            location = %query.location,
            count = query.count,
            "session started"
        );

        let completed = sources.is_empty();
        if completed {
            self.status = Status::Completed;
            info!(session = %id, "no providers configured, session completed");
        }
        self.session = Some(Session {
            id,
            sources,
            completed,
        });
        self.snapshot()
    }

    /// Apply one source event.  Returns an update when something the
    /// projector shows has changed.
    pub fn handle_event(&mut self, event: SourceEvent) -> Option<Update> {
        let session = match self.session.as_mut() {
            Some(session) if session.id == event.session && !session.completed => session,
            _ => {
                debug!(session = %event.session, "discarding event from an inactive session");
                return None;
            }
        };
        let slot = session.sources.get_mut(event.source.0)?;
        if slot.state.is_terminal() {
            debug!(provider = %slot.provider, "discarding event after terminal state");
            return None;
        }

        match event.kind {
            SourceEventKind::Opened => {
                slot.state = SourceState::Open;
                None
            }
            SourceEventKind::Message(raw) => match decode(&raw) {
                Ok(record) => {
                    self.insert(record);
                    Some(self.snapshot())
                }
                Err(e) => {
                    warn!(provider = %slot.provider, error = %e, "dropping undecodable message");
                    None
                }
            },
            kind @ (SourceEventKind::Closed | SourceEventKind::Failed(_)) => {
                slot.state = if matches!(kind, SourceEventKind::Failed(_)) {
                    SourceState::Failed
                } else {
                    SourceState::Closed
                };
                if !session.sources.iter().all(|s| s.state.is_terminal()) {
                    return None;
                }

                session.completed = true;
                info!(
                    session = %session.id,
                    records = self.records.len(),
                    failed = session.failed(),
                    "session completed"
                );
                self.status = Status::Completed;
                Some(self.snapshot())
            }
        }
    }

    /// Close every source of the running session, if any.
    pub fn shutdown(&mut self) {
        self.supersede();
    }

    /// Insert keeping newest-first order, then persist.
    fn insert(&mut self, record: Record) {
        let index = insertion_index(&self.records, &record);
        debug!(name = %record.name, index, "merging record");
        self.records.insert(index, record);

        if let Err(e) = self.store.save(&self.records) {
            warn!(error = %e, "could not persist aggregate; in-memory copy is unaffected");
        }
    }

    fn supersede(&mut self) {
        if let Some(mut session) = self.session.take() {
            if !session.completed {
                info!(session = %session.id, "superseding running session");
            }
            for slot in &mut session.sources {
                slot.handle.close();
            }
        }
    }

    /// Run the control loop until [`Command::Shutdown`] or until either the
    /// command or update channel is closed.
    ///
    /// Publishes the stored aggregate once on startup.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<SourceEvent>,
        updates: mpsc::UnboundedSender<Update>,
    ) {
        if updates.send(self.snapshot()).is_ok() {
            loop {
                let update = tokio::select! {
                    command = commands.recv() => match command {
                        Some(Command::Search(params)) => Some(self.search(&params)),
                        Some(Command::Shutdown) | None => break,
                    },
                    Some(event) = events.recv() => self.handle_event(event),
                };

                // Projector gone: nobody is watching any more.
                if let Some(update) = update {
                    if updates.send(update).is_err() {
                        break;
                    }
                }
            }
        }

        self.shutdown();
        debug!(
            records = self.current_aggregate().len(),
            status = ?self.status(),
            "aggregator stopped"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
