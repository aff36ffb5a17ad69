//! # Content Store
//!
//! Validates input at the boundary, then hands a single transactional unit
//! to the `ContentRepo`. Counters are never written from here.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{
    CommentThread, Content, Listing, NewComment, NewPost, NewReport, NewRequest, Page, ReportId,
    Tag, User, UserId, Yell, YellId, YellKind,
};
use crate::traits::ContentRepo;
use crate::validation;

#[derive(Clone)]
pub struct ContentStore {
    repo: Arc<dyn ContentRepo>,
}

impl ContentStore {
    pub fn new(repo: Arc<dyn ContentRepo>) -> Self {
        Self { repo }
    }

    pub async fn register_user(&self, username: &str) -> Result<UserId> {
        let username = validation::username(username)?;
        let id = self.repo.create_user(&username).await?;
        info!(user_id = %id, %username, "user registered");
        Ok(id)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<YellId> {
        let post = validation::post(post)?;
        let id = self.repo.insert_post(&post).await?;
        info!(yell_id = %id, author_id = %post.author_id, tags = post.tags.len(), "post created");
        Ok(id)
    }

    pub async fn create_request(&self, request: &NewRequest) -> Result<YellId> {
        let request = validation::request(request)?;
        let id = self.repo.insert_request(&request).await?;
        info!(yell_id = %id, author_id = %request.author_id, "request created");
        Ok(id)
    }

    /// Appends a comment to the target's CommentSet and bumps the target's
    /// `comment_count` in the same transaction.
    pub async fn create_comment(&self, comment: &NewComment) -> Result<YellId> {
        validation::comment(comment)?;
        let id = self.repo.insert_comment(comment).await?;
        info!(
            comment_id = %id,
            target_id = %comment.target,
            author_id = %comment.author_id,
            "comment posted"
        );
        Ok(id)
    }

    /// Resolves base and extension rows. A kind mismatch is reported as
    /// not found, the same as a missing id.
    pub async fn get(&self, id: YellId, kind: YellKind) -> Result<Content> {
        match self.repo.get_content(id).await? {
            Some(content) if content.yell.kind == kind => Ok(content),
            _ => Err(AppError::not_found(kind.as_str(), id)),
        }
    }

    pub async fn get_latest(&self, kind: YellKind, page: Page) -> Result<Vec<Yell>> {
        self.repo.list(kind, Listing::Latest, page).await
    }

    pub async fn get_top_rated(&self, kind: YellKind, page: Page) -> Result<Vec<Yell>> {
        self.repo.list(kind, Listing::TopRated, page).await
    }

    pub async fn tags(&self, id: YellId) -> Result<Vec<Tag>> {
        self.repo.tags(id).await
    }

    pub async fn comments(&self, id: YellId) -> Result<CommentThread> {
        self.repo
            .comment_thread(id)
            .await?
            .ok_or_else(|| AppError::not_found("comment set for yell", id))
    }

    /// Only the request's own author may flip `resolved`.
    pub async fn set_resolved(&self, id: YellId, actor: UserId, resolved: bool) -> Result<()> {
        let content = self
            .repo
            .get_content(id)
            .await?
            .ok_or_else(|| AppError::not_found("yell", id))?;

        if content.yell.kind != YellKind::Request {
            return Err(AppError::validation(format!(
                "only requests can be resolved, yell {id} is a {}",
                content.yell.kind
            )));
        }
        if content.yell.author_id != actor {
            warn!(yell_id = %id, actor = %actor, "resolve attempt by non-author");
            return Err(AppError::Unauthorized(
                "only the author may resolve this request".into(),
            ));
        }

        self.repo.set_resolved(id, resolved).await?;
        info!(yell_id = %id, resolved, "request resolution changed");
        Ok(())
    }

    pub async fn report(&self, report: &NewReport) -> Result<ReportId> {
        validation::report(report)?;
        let id = self.repo.insert_report(report).await?;
        info!(report_id = %id, yell_id = %report.owning_yell_id, "yell reported");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Extension, Request};
    use crate::traits::MockContentRepo;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn request_content(id: i64, author: i64) -> Content {
        Content {
            yell: Yell {
                id: YellId(id),
                author_id: UserId(author),
                title: "need a parser".into(),
                kind: YellKind::Request,
                created_at: Utc::now(),
                rating_total: 0,
                comment_count: 0,
            },
            extension: Extension::Request(Request {
                base_yell_id: YellId(id),
                content: "looking for a toml parser".into(),
                resolved: false,
            }),
        }
    }

    #[tokio::test]
    async fn test_invalid_post_never_reaches_repo() {
        let mut repo = MockContentRepo::new();
        repo.expect_insert_post().never();
        let store = ContentStore::new(Arc::new(repo));

        let post = NewPost {
            author_id: UserId(1),
            title: "ok title".into(),
            description: "fine".into(),
            code: "x".into(),
            filename: "a.rs".into(),
            tags: vec!["t".repeat(31)],
        };
        assert!(matches!(
            store.create_post(&post).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_get_rejects_kind_mismatch() {
        let mut repo = MockContentRepo::new();
        repo.expect_get_content()
            .with(eq(YellId(3)))
            .returning(|id| Ok(Some(request_content(id.0, 1))));
        let store = ContentStore::new(Arc::new(repo));

        assert!(store.get(YellId(3), YellKind::Request).await.is_ok());
        assert_eq!(
            store.get(YellId(3), YellKind::Post).await.unwrap_err(),
            AppError::not_found("post", 3)
        );
    }

    #[tokio::test]
    async fn test_only_author_resolves() {
        let mut repo = MockContentRepo::new();
        repo.expect_get_content()
            .returning(|id| Ok(Some(request_content(id.0, 7))));
        repo.expect_set_resolved()
            .with(eq(YellId(5)), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));
        let store = ContentStore::new(Arc::new(repo));

        assert!(matches!(
            store.set_resolved(YellId(5), UserId(8), true).await,
            Err(AppError::Unauthorized(_))
        ));
        store.set_resolved(YellId(5), UserId(7), true).await.unwrap();
    }

    #[tokio::test]
    async fn test_register_lowercases() {
        let mut repo = MockContentRepo::new();
        repo.expect_create_user()
            .withf(|name| name.to_string() == "ferris")
            .returning(|_| Ok(UserId(1)));
        let store = ContentStore::new(Arc::new(repo));

        assert_eq!(store.register_user("Ferris").await.unwrap(), UserId(1));
    }
}
