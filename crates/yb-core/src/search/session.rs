//! Search session protocol.
//!
//! Server-driven pull over one connection: scan until a batch of
//! `SEARCH_BATCH_SIZE` qualifying ids is full, send it best-first, then
//! suspend until the client sends `"next"`. The final batch is flushed
//! without waiting. Every completed session ends with `"404"`.

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::YellId;
use crate::search::scanner::{self, Query, SearchCandidate};
use crate::search::transport::{SearchTransport, TransportClosed};

pub const SEARCH_BATCH_SIZE: usize = 15;
/// Terminal value of every completed session.
pub const END_OF_RESULTS: &str = "404";
/// The only client token that advances past a full batch.
pub const ADVANCE_TOKEN: &str = "next";

// Candidates scanned between disconnect probes.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// Where `run` is in the protocol. `Closed` is only reached after the
/// sentinel went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Scanning,
    AwaitingAck,
    Draining,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch {
    pub id: YellId,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Snapshot exhausted and the sentinel delivered.
    Completed,
    /// Client went away; no sentinel could be delivered.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub scanned: usize,
    pub batches: usize,
    pub results: usize,
    pub end: SessionEnd,
}

pub struct SearchSession {
    id: Uuid,
    query: Query,
    snapshot: Vec<SearchCandidate>,
    cursor: usize,
    batch: Vec<ScoredMatch>,
    batches: usize,
    results: usize,
}

impl SearchSession {
    /// Takes ownership of the snapshot and orders it by id ascending.
    pub fn new(query: &str, mut snapshot: Vec<SearchCandidate>) -> Self {
        snapshot.sort_by_key(|candidate| candidate.id);
        Self {
            id: Uuid::new_v4(),
            query: Query::new(query),
            snapshot,
            cursor: 0,
            batch: Vec::with_capacity(SEARCH_BATCH_SIZE),
            batches: 0,
            results: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn exhausted(&self) -> bool {
        self.cursor >= self.snapshot.len()
    }

    /// Drives the session to completion or disconnect. The snapshot is
    /// released when this returns.
    ///
    /// The batch size is checked before the next candidate is scored, so a
    /// batch that fills on the last candidate is flushed together with the
    /// sentinel and needs no ack.
    #[instrument(skip_all, fields(session_id = %self.id, query = %self.query.as_str()))]
    pub async fn run<T>(mut self, transport: &mut T) -> SessionSummary
    where
        T: SearchTransport + ?Sized,
    {
        info!(candidates = self.snapshot.len(), "search session started");

        let mut state = SessionState::Scanning;
        let end = loop {
            state = match state {
                SessionState::Scanning => {
                    if !self.fill_batch(transport).await {
                        break SessionEnd::Disconnected;
                    }
                    if self.exhausted() {
                        SessionState::Draining
                    } else if self.flush(transport).await.is_err() {
                        break SessionEnd::Disconnected;
                    } else {
                        SessionState::AwaitingAck
                    }
                }
                SessionState::AwaitingAck => match transport.receive().await {
                    Some(token) if token == ADVANCE_TOKEN => SessionState::Scanning,
                    Some(token) => {
                        debug!(%token, "ignoring token while awaiting ack");
                        SessionState::AwaitingAck
                    }
                    None => break SessionEnd::Disconnected,
                },
                SessionState::Draining => {
                    if self.flush(transport).await.is_err()
                        || transport.send(END_OF_RESULTS.to_string()).await.is_err()
                    {
                        break SessionEnd::Disconnected;
                    }
                    SessionState::Closed
                }
                SessionState::Closed => break SessionEnd::Completed,
            };
        };

        let summary = SessionSummary {
            session_id: self.id,
            scanned: self.cursor,
            batches: self.batches,
            results: self.results,
            end,
        };
        info!(
            scanned = summary.scanned,
            batches = summary.batches,
            results = summary.results,
            end = ?summary.end,
            "search session closed"
        );
        summary
    }

    /// Scans until the batch is full or the snapshot is exhausted.
    /// Returns `false` if the transport closed mid-scan.
    ///
    /// Yields to the runtime at every probe so the tasks that own the
    /// client side get to run, and observe a close, during a long scan.
    async fn fill_batch<T>(&mut self, transport: &mut T) -> bool
    where
        T: SearchTransport + ?Sized,
    {
        while self.batch.len() < SEARCH_BATCH_SIZE && !self.exhausted() {
            let candidate = &self.snapshot[self.cursor];
            if let Some(score) = scanner::score(&self.query, candidate) {
                if scanner::qualifies(score) {
                    self.batch.push(ScoredMatch {
                        id: candidate.id,
                        score,
                    });
                }
            }
            self.cursor += 1;

            if self.cursor % CANCEL_CHECK_INTERVAL == 0 {
                tokio::task::yield_now().await;
                if transport.is_closed() {
                    debug!(cursor = self.cursor, "client gone, abandoning scan");
                    return false;
                }
            }
        }
        true
    }

    /// Sends the batch best-first. Equal scores keep scan order.
    async fn flush<T>(&mut self, transport: &mut T) -> Result<(), TransportClosed>
    where
        T: SearchTransport + ?Sized,
    {
        if self.batch.is_empty() {
            return Ok(());
        }

        let mut batch = std::mem::take(&mut self.batch);
        batch.sort_by(|a, b| b.score.total_cmp(&a.score));
        for found in &batch {
            transport.send(found.id.to_string()).await?;
            self.results += 1;
        }
        self.batches += 1;
        debug!(batch = self.batches, size = batch.len(), "batch sent");

        batch.clear();
        self.batch = batch;
        Ok(())
    }
}
