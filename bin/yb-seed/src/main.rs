//! Fills a database with random users, posts, requests, comments and likes.
//!
//! Usage: `yb-seed [users]` (default 10). The target database comes from the
//! same settings the server reads.

use std::sync::Arc;

use anyhow::{bail, Context};
use fake::faker::lorem::en::{Sentence, Word, Words};
use fake::Fake;
use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::EnvFilter;
use yb_configs::Settings;
use yb_core::{
    CommentEngine, ContentRepo, ContentStore, NewPost, NewRequest, RatingEngine, UserId, YellId,
};
use yb_db_sqlite::SqliteContentRepo;

const DEFAULT_USERS: usize = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let users = match std::env::args().nth(1) {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid user count {raw:?}"))?,
        None => DEFAULT_USERS,
    };
    if users == 0 {
        bail!("user count must be at least 1");
    }

    let settings = Settings::load().context("loading settings")?;
    let repo: Arc<dyn ContentRepo> = Arc::new(
        SqliteContentRepo::connect(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("opening sqlite database")?,
    );

    let store = ContentStore::new(repo.clone());
    let comments = CommentEngine::new(repo.clone());
    let ratings = RatingEngine::new(repo);

    let mut authored: Vec<(UserId, YellId)> = Vec::with_capacity(users);
    for i in 0..users {
        let author = store.register_user(&username(i)).await?;
        let post = store.create_post(&random_post(author)).await?;
        store.create_request(&random_request(author)).await?;

        // Each newcomer reacts to whoever came before.
        if let Some(&(_, previous)) = authored.last() {
            let remark: String = Sentence(3..10).fake();
            comments.post_comment(author, previous, &remark).await?;
            ratings.like(previous, author).await?;
        }
        authored.push((author, post));
    }

    info!(users, posts = users, requests = users, "seeding complete");
    Ok(())
}

// Usernames must be alphanumeric; the index keeps them unique within a run.
fn username(index: usize) -> String {
    let word: String = Word().fake();
    let mut name: String = word
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(40)
        .collect();
    name.push_str(&format!("{index:04}"));
    name
}

fn random_post(author_id: UserId) -> NewPost {
    let word: String = Word().fake();
    NewPost {
        author_id,
        title: Sentence(2..6).fake(),
        description: Sentence(6..20).fake(),
        code: format!("fn {word}() {{\n    todo!()\n}}\n"),
        filename: format!("{}.rs", word.chars().take(40).collect::<String>()),
        tags: random_tags(),
    }
}

fn random_request(author_id: UserId) -> NewRequest {
    NewRequest {
        author_id,
        title: Sentence(2..6).fake(),
        content: Sentence(8..30).fake(),
        tags: random_tags(),
    }
}

fn random_tags() -> Vec<String> {
    Words(1..4).fake()
}
