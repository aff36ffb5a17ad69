//! Shared fixtures for the end-to-end suites: an in-memory store with the
//! engines wired the way the server wires them.

use std::sync::Arc;

use yb_core::{
    CommentEngine, ContentRepo, ContentStore, NewPost, NewRequest, RatingEngine, SearchService,
    UserId, YellId,
};
use yb_db_sqlite::SqliteContentRepo;

pub struct Board {
    pub store: ContentStore,
    pub ratings: RatingEngine,
    pub comments: CommentEngine,
    pub search: SearchService,
}

impl Board {
    pub async fn in_memory() -> anyhow::Result<Self> {
        let repo: Arc<dyn ContentRepo> = Arc::new(SqliteContentRepo::new("sqlite::memory:").await?);
        Ok(Self {
            store: ContentStore::new(repo.clone()),
            ratings: RatingEngine::new(repo.clone()),
            comments: CommentEngine::new(repo.clone()),
            search: SearchService::new(repo),
        })
    }

    pub async fn user(&self, name: &str) -> anyhow::Result<UserId> {
        Ok(self.store.register_user(name).await?)
    }

    pub async fn post(&self, author_id: UserId, title: &str) -> anyhow::Result<YellId> {
        Ok(self
            .store
            .create_post(&NewPost {
                author_id,
                title: title.to_string(),
                description: "walks a sorted slice".to_string(),
                code: "let mid = len / 2;".to_string(),
                filename: "main.rs".to_string(),
                tags: vec!["algorithms".to_string()],
            })
            .await?)
    }

    pub async fn request(&self, author_id: UserId, title: &str) -> anyhow::Result<YellId> {
        Ok(self
            .store
            .create_request(&NewRequest {
                author_id,
                title: title.to_string(),
                content: "how do i borrow this twice".to_string(),
                tags: Vec::new(),
            })
            .await?)
    }
}
