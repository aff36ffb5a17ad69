//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    CommentThread, Content, Listing, NewComment, NewPost, NewReport, NewRequest, Page, ReportId,
    Tag, User, UserId, Yell, YellId, YellKind,
};
use crate::rating::{RatingAction, RatingReceipt, RatingState};
use crate::search::SearchCandidate;

/// Data persistence contract for the content graph.
///
/// Every mutating method is one transaction: either all of its rows and
/// counter updates commit, or none do. Inputs arrive already validated.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentRepo: Send + Sync {
    // User Operations
    async fn create_user(&self, username: &str) -> Result<UserId>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    // Creation. Each inserts the Yell, its extension, its CommentSet (posts
    // and requests) and its tags.
    async fn insert_post(&self, post: &NewPost) -> Result<YellId>;
    async fn insert_request(&self, request: &NewRequest) -> Result<YellId>;
    /// Appends to the target's CommentSet and bumps the target's
    /// `comment_count` in the same transaction.
    async fn insert_comment(&self, comment: &NewComment) -> Result<YellId>;

    // Reads
    async fn get_content(&self, id: YellId) -> Result<Option<Content>>;
    async fn list(&self, kind: YellKind, order: Listing, page: Page) -> Result<Vec<Yell>>;
    async fn tags(&self, id: YellId) -> Result<Vec<Tag>>;
    async fn comment_thread(&self, id: YellId) -> Result<Option<CommentThread>>;

    // Request Operations
    async fn set_resolved(&self, id: YellId, resolved: bool) -> Result<()>;

    // Rating Operations
    async fn rating_status(&self, id: YellId, critic: UserId) -> Result<RatingState>;
    /// Reads the current state, applies the transition and writes the Rating
    /// row plus `rating_total` under one transaction.
    async fn apply_rating(
        &self,
        id: YellId,
        critic: UserId,
        action: RatingAction,
    ) -> Result<RatingReceipt>;

    // Moderation
    async fn insert_report(&self, report: &NewReport) -> Result<ReportId>;

    // Search
    /// Every Yell joined with what the scanner needs, ordered by id ascending.
    async fn search_snapshot(&self) -> Result<Vec<SearchCandidate>>;
}
