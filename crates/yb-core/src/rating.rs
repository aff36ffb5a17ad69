//! # Rating Engine
//!
//! Per-(Yell, critic) like/unlike state machine. The transition itself is
//! pure; repositories apply it inside the same transaction that writes the
//! Rating row and the Yell's `rating_total`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{UserId, YellId};
use crate::traits::ContentRepo;

/// Persisted value of a Rating row. "No opinion" is the absence of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingValue {
    Liked,
    Unliked,
}

impl RatingValue {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingValue::Liked => "liked",
            RatingValue::Unliked => "unliked",
        }
    }
}

impl FromStr for RatingValue {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "liked" => Ok(RatingValue::Liked),
            "unliked" => Ok(RatingValue::Unliked),
            other => Err(AppError::Internal(format!("corrupt rating value '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingState {
    Unset,
    Liked,
    Unliked,
}

impl RatingState {
    pub fn is_set(self) -> bool {
        !matches!(self, RatingState::Unset)
    }

    pub fn value(self) -> Option<RatingValue> {
        match self {
            RatingState::Unset => None,
            RatingState::Liked => Some(RatingValue::Liked),
            RatingState::Unliked => Some(RatingValue::Unliked),
        }
    }

    pub fn apply(self, action: RatingAction) -> RatingTransition {
        use RatingAction::{Like, Unlike};
        use RatingState::{Liked, Unliked, Unset};

        let (next, delta, outcome) = match (self, action) {
            (Unset, Like) | (Unliked, Like) => (Liked, 1, RatingOutcome::Liked),
            (Liked, Unlike) => (Unliked, -1, RatingOutcome::Unliked),
            (Unset, Unlike) => (Unliked, 0, RatingOutcome::FalseUnlike),
            (Liked, Like) => (Liked, 0, RatingOutcome::AlreadyLiked),
            (Unliked, Unlike) => (Unliked, 0, RatingOutcome::AlreadyUnliked),
        };

        RatingTransition {
            previous: self,
            next,
            delta,
            outcome,
        }
    }
}

impl From<Option<RatingValue>> for RatingState {
    fn from(value: Option<RatingValue>) -> Self {
        match value {
            None => RatingState::Unset,
            Some(RatingValue::Liked) => RatingState::Liked,
            Some(RatingValue::Unliked) => RatingState::Unliked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingAction {
    Like,
    Unlike,
}

/// What the caller is told. The last three are benign warnings, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingOutcome {
    Liked,
    Unliked,
    FalseUnlike,
    AlreadyLiked,
    AlreadyUnliked,
}

impl RatingOutcome {
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            RatingOutcome::FalseUnlike | RatingOutcome::AlreadyLiked | RatingOutcome::AlreadyUnliked
        )
    }
}

impl fmt::Display for RatingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RatingOutcome::Liked => "liked",
            RatingOutcome::Unliked => "unliked",
            RatingOutcome::FalseUnlike => "false_unlike",
            RatingOutcome::AlreadyLiked => "already_liked",
            RatingOutcome::AlreadyUnliked => "already_unliked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingTransition {
    pub previous: RatingState,
    pub next: RatingState,
    /// Amount added to `rating_total`: -1, 0 or +1
    pub delta: i64,
    pub outcome: RatingOutcome,
}

/// How the Rating row must change for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWrite {
    Keep,
    Insert(RatingValue),
    Update(RatingValue),
}

impl RatingTransition {
    pub fn row_write(&self) -> RowWrite {
        if self.previous == self.next {
            return RowWrite::Keep;
        }
        match (self.previous, self.next.value()) {
            (_, None) => RowWrite::Keep,
            (RatingState::Unset, Some(v)) => RowWrite::Insert(v),
            (_, Some(v)) => RowWrite::Update(v),
        }
    }
}

/// Result of a like/unlike call, with the counter as committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingReceipt {
    pub yell_id: YellId,
    pub critic_id: UserId,
    pub transition: RatingTransition,
    pub rating_total: i64,
}

#[derive(Clone)]
pub struct RatingEngine {
    repo: Arc<dyn ContentRepo>,
}

impl RatingEngine {
    pub fn new(repo: Arc<dyn ContentRepo>) -> Self {
        Self { repo }
    }

    pub async fn like(&self, yell_id: YellId, critic_id: UserId) -> Result<RatingReceipt> {
        self.rate(yell_id, critic_id, RatingAction::Like).await
    }

    pub async fn unlike(&self, yell_id: YellId, critic_id: UserId) -> Result<RatingReceipt> {
        self.rate(yell_id, critic_id, RatingAction::Unlike).await
    }

    /// Read-only. `RatingState::Unset` when the critic never rated this Yell.
    pub async fn status(&self, yell_id: YellId, critic_id: UserId) -> Result<RatingState> {
        self.repo.rating_status(yell_id, critic_id).await
    }

    async fn rate(
        &self,
        yell_id: YellId,
        critic_id: UserId,
        action: RatingAction,
    ) -> Result<RatingReceipt> {
        let receipt = self.repo.apply_rating(yell_id, critic_id, action).await?;
        if receipt.transition.outcome.is_warning() {
            debug!(%yell_id, %critic_id, outcome = %receipt.transition.outcome, "rating unchanged");
        } else {
            info!(
                %yell_id,
                %critic_id,
                outcome = %receipt.transition.outcome,
                rating_total = receipt.rating_total,
                "rating applied"
            );
        }
        Ok(receipt)
    }
}
