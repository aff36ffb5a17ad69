//! # Search
//!
//! `scanner` scores one candidate; `session` streams qualifying ids in
//! acknowledged batches; `transport` is the duplex channel it streams over.

pub mod scanner;
pub mod session;
pub mod transport;

use std::sync::Arc;

use crate::error::Result;
use crate::traits::ContentRepo;

pub use scanner::{
    score, similarity, weighted_score, CandidateBody, Query, SearchCandidate, SCORE_THRESHOLD,
};
pub use session::{
    SearchSession, SessionEnd, SessionState, SessionSummary, ADVANCE_TOKEN, END_OF_RESULTS,
    SEARCH_BATCH_SIZE,
};
pub use transport::{ChannelTransport, ClientEnd, SearchTransport, TransportClosed};

/// Opens sessions over a fresh snapshot of the content graph.
#[derive(Clone)]
pub struct SearchService {
    repo: Arc<dyn ContentRepo>,
}

impl SearchService {
    pub fn new(repo: Arc<dyn ContentRepo>) -> Self {
        Self { repo }
    }

    /// Each session owns its own snapshot; writes committed after this call
    /// are not visible to it.
    pub async fn open(&self, query: &str) -> Result<SearchSession> {
        let snapshot = self.repo.search_snapshot().await?;
        Ok(SearchSession::new(query, snapshot))
    }
}
