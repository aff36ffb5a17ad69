//! # Comment Engine
//!
//! A comment is a Yell of kind `comment` appended to the CommentSet of a
//! post or request. The target's `comment_count` moves in the same
//! transaction as the append.
//!
//! Not idempotent: a caller that sees an ambiguous failure must re-read the
//! thread before retrying, or the comment (and the count) will be doubled.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{NewComment, UserId, YellId};
use crate::store::ContentStore;
use crate::traits::ContentRepo;

#[derive(Clone)]
pub struct CommentEngine {
    store: ContentStore,
}

impl CommentEngine {
    pub fn new(repo: Arc<dyn ContentRepo>) -> Self {
        Self {
            store: ContentStore::new(repo),
        }
    }

    pub async fn post_comment(
        &self,
        author_id: UserId,
        target: YellId,
        content: &str,
    ) -> Result<YellId> {
        let comment = NewComment {
            author_id,
            target,
            content: content.to_string(),
        };
        self.store.create_comment(&comment).await
    }
}
