//! # yb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `yb-core` content graph.
//!
//! Every mutating call runs inside one transaction. Calls that read before
//! they write start with a write to the target `yells` row, so SQLite takes
//! the write lock up front and concurrent callers serialize instead of
//! failing on lock upgrade.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use tracing::{debug, error};
use yb_core::error::{AppError, Result};
use yb_core::models::{
    Comment, CommentSet, CommentSetId, CommentThread, Content, Extension, Listing, NewComment,
    NewPost, NewReport, NewRequest, Page, Post, ReportId, Request, Tag, User, UserId, Yell,
    YellId, YellKind,
};
use yb_core::rating::{RatingAction, RatingReceipt, RatingState, RatingValue, RowWrite};
use yb_core::search::{CandidateBody, SearchCandidate};
use yb_core::traits::ContentRepo;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const YELL_COLUMNS: &str =
    "y.id, y.author_id, y.title, y.kind, y.created_at, y.rating_total, y.comment_count";

pub struct SqliteContentRepo {
    pool: SqlitePool,
}

impl SqliteContentRepo {
    /// Opens (or creates) the database and applies pending migrations.
    pub async fn new(url: &str) -> Result<Self> {
        Self::connect(url, 5).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives and dies with its single connection.
        let mut pool = SqlitePoolOptions::new();
        if in_memory {
            pool = pool.max_connections(1).idle_timeout(None).max_lifetime(None);
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            pool = pool.max_connections(max_connections);
        }

        let pool = pool.connect_with(options).await.map_err(db_err)?;
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {e}")))?;

        debug!(url, in_memory, "sqlite content repo ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::NotFound("referenced entity".into(), db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            AppError::ValidationError(db.message().to_string())
        }
        _ => {
            error!(error = %e, "database failure");
            AppError::Internal(e.to_string())
        }
    }
}

fn yell_from_row(row: &SqliteRow) -> Result<Yell> {
    let kind: String = row.try_get("kind").map_err(db_err)?;
    Ok(Yell {
        id: YellId(row.try_get("id").map_err(db_err)?),
        author_id: UserId(row.try_get("author_id").map_err(db_err)?),
        title: row.try_get("title").map_err(db_err)?,
        kind: kind.parse()?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        rating_total: row.try_get("rating_total").map_err(db_err)?,
        comment_count: row.try_get("comment_count").map_err(db_err)?,
    })
}

fn missing_extension(id: YellId, kind: YellKind) -> AppError {
    error!(yell_id = %id, %kind, "yell has no extension row");
    AppError::Internal(format!("{kind} {id} has no extension row"))
}

/// Reads a LEFT JOINed extension column that must be present for `kind`.
fn extension_column(row: &SqliteRow, column: &str, id: YellId, kind: YellKind) -> Result<String> {
    row.try_get::<Option<String>, _>(column)
        .map_err(db_err)?
        .ok_or_else(|| missing_extension(id, kind))
}

/// Inserts the base row and returns its generated id.
async fn insert_yell(
    conn: &mut SqliteConnection,
    author_id: UserId,
    title: &str,
    kind: YellKind,
) -> Result<YellId> {
    let id = sqlx::query(
        "INSERT INTO yells (author_id, title, kind, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(author_id.0)
    .bind(title)
    .bind(kind.as_str())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?
    .last_insert_rowid();
    Ok(YellId(id))
}

async fn insert_comment_set(conn: &mut SqliteConnection, owner: YellId) -> Result<()> {
    sqlx::query("INSERT INTO comment_sets (owning_yell_id) VALUES (?)")
        .bind(owner.0)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn insert_tags(conn: &mut SqliteConnection, owner: YellId, tags: &[String]) -> Result<()> {
    for tag in tags {
        sqlx::query("INSERT INTO tags (owning_yell_id, content) VALUES (?, ?)")
            .bind(owner.0)
            .bind(tag)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

#[async_trait]
impl ContentRepo for SqliteContentRepo {
    async fn create_user(&self, username: &str) -> Result<UserId> {
        let id = sqlx::query("INSERT INTO users (username) VALUES (?)")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .last_insert_rowid();
        Ok(UserId(id))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let username: Option<String> =
            sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(username.map(|username| User { id, username }))
    }

    /// Atomic operation to create a post, its comment set and its tags.
    ///
    /// # Developer Note
    /// Using a Transaction (tx) ensures we don't end up with "ghost yells"
    /// that have no extension row if a later insert fails.
    async fn insert_post(&self, post: &NewPost) -> Result<YellId> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let id = insert_yell(&mut tx, post.author_id, &post.title, YellKind::Post).await?;
        sqlx::query("INSERT INTO posts (yell_id, description, code, filename) VALUES (?, ?, ?, ?)")
            .bind(id.0)
            .bind(&post.description)
            .bind(&post.code)
            .bind(&post.filename)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        insert_comment_set(&mut tx, id).await?;
        insert_tags(&mut tx, id, &post.tags).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(id)
    }

    async fn insert_request(&self, request: &NewRequest) -> Result<YellId> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let id = insert_yell(&mut tx, request.author_id, &request.title, YellKind::Request).await?;
        sqlx::query("INSERT INTO requests (yell_id, content, resolved) VALUES (?, ?, ?)")
            .bind(id.0)
            .bind(&request.content)
            .bind(false)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        insert_comment_set(&mut tx, id).await?;
        insert_tags(&mut tx, id, &request.tags).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(id)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<YellId> {
        let target = comment.target;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Counter first: takes the write lock and proves the target can host
        // discussion. Any later failure rolls it back.
        let bumped = sqlx::query(
            "UPDATE yells SET comment_count = comment_count + 1 \
             WHERE id = ? AND kind IN ('post', 'request')",
        )
        .bind(target.0)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();

        if bumped == 0 {
            let kind: Option<String> = sqlx::query_scalar("SELECT kind FROM yells WHERE id = ?")
                .bind(target.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
            return Err(match kind {
                None => AppError::not_found("yell", target),
                Some(kind) => AppError::validation(format!(
                    "comments can only be posted on posts and requests, yell {target} is a {kind}"
                )),
            });
        }

        let set_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM comment_sets WHERE owning_yell_id = ?")
                .bind(target.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let Some(set_id) = set_id else {
            error!(target_id = %target, "existing yell has no comment set");
            return Err(AppError::not_found("comment set for yell", target));
        };

        let id = insert_yell(&mut tx, comment.author_id, "", YellKind::Comment).await?;
        sqlx::query("INSERT INTO comments (yell_id, comment_set_id, content) VALUES (?, ?, ?)")
            .bind(id.0)
            .bind(set_id)
            .bind(&comment.content)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(id)
    }

    /// Retrieves the base row and its extension in a single join.
    async fn get_content(&self, id: YellId) -> Result<Option<Content>> {
        let sql = format!(
            "SELECT {YELL_COLUMNS}, \
                    p.description, p.code, p.filename, \
                    r.content AS request_content, r.resolved, \
                    c.comment_set_id, c.content AS comment_content \
             FROM yells y \
             LEFT JOIN posts p ON p.yell_id = y.id \
             LEFT JOIN requests r ON r.yell_id = y.id \
             LEFT JOIN comments c ON c.yell_id = y.id \
             WHERE y.id = ?"
        );
        let Some(row) = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let yell = yell_from_row(&row)?;
        let extension = match yell.kind {
            YellKind::Post => {
                let description: Option<String> = row.try_get("description").map_err(db_err)?;
                let code: Option<String> = row.try_get("code").map_err(db_err)?;
                let filename: Option<String> = row.try_get("filename").map_err(db_err)?;
                match (description, code, filename) {
                    (Some(description), Some(code), Some(filename)) => Extension::Post(Post {
                        base_yell_id: id,
                        description,
                        code,
                        filename,
                    }),
                    _ => return Err(missing_extension(id, yell.kind)),
                }
            }
            YellKind::Request => {
                let content: Option<String> = row.try_get("request_content").map_err(db_err)?;
                let resolved: Option<bool> = row.try_get("resolved").map_err(db_err)?;
                match (content, resolved) {
                    (Some(content), Some(resolved)) => Extension::Request(Request {
                        base_yell_id: id,
                        content,
                        resolved,
                    }),
                    _ => return Err(missing_extension(id, yell.kind)),
                }
            }
            YellKind::Comment => {
                let set_id: Option<i64> = row.try_get("comment_set_id").map_err(db_err)?;
                let content: Option<String> = row.try_get("comment_content").map_err(db_err)?;
                match (set_id, content) {
                    (Some(set_id), Some(content)) => Extension::Comment(Comment {
                        base_yell_id: id,
                        comment_set_id: CommentSetId(set_id),
                        content,
                    }),
                    _ => return Err(missing_extension(id, yell.kind)),
                }
            }
        };

        Ok(Some(Content { yell, extension }))
    }

    async fn list(&self, kind: YellKind, order: Listing, page: Page) -> Result<Vec<Yell>> {
        let order_by = match order {
            Listing::Latest => "y.id DESC",
            Listing::TopRated => "y.rating_total DESC, y.id DESC",
        };
        let sql = format!(
            "SELECT {YELL_COLUMNS} FROM yells y WHERE y.kind = ? ORDER BY {order_by} LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(yell_from_row).collect()
    }

    async fn tags(&self, id: YellId) -> Result<Vec<Tag>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT content FROM tags WHERE owning_yell_id = ? ORDER BY id")
                .bind(id.0)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|content| Tag {
                owning_yell_id: id,
                content,
            })
            .collect())
    }

    async fn comment_thread(&self, id: YellId) -> Result<Option<CommentThread>> {
        let set_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM comment_sets WHERE owning_yell_id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        let Some(set_id) = set_id else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {YELL_COLUMNS}, c.content AS comment_content \
             FROM comments c JOIN yells y ON y.id = c.yell_id \
             WHERE c.comment_set_id = ? ORDER BY c.yell_id ASC"
        );
        let comments = sqlx::query(&sql)
            .bind(set_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(|row| {
                let yell = yell_from_row(row)?;
                let comment = Comment {
                    base_yell_id: yell.id,
                    comment_set_id: CommentSetId(set_id),
                    content: row.try_get("comment_content").map_err(db_err)?,
                };
                Ok((yell, comment))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(CommentThread {
            set: CommentSet {
                id: CommentSetId(set_id),
                owning_yell_id: id,
            },
            comments,
        }))
    }

    async fn set_resolved(&self, id: YellId, resolved: bool) -> Result<()> {
        let updated = sqlx::query("UPDATE requests SET resolved = ? WHERE yell_id = ?")
            .bind(resolved)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::not_found("request", id));
        }
        Ok(())
    }

    async fn rating_status(&self, id: YellId, critic: UserId) -> Result<RatingState> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM ratings WHERE owning_yell_id = ? AND critic_id = ?",
        )
        .bind(id.0)
        .bind(critic.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let value = value.map(|v| v.parse::<RatingValue>()).transpose()?;
        Ok(RatingState::from(value))
    }

    async fn apply_rating(
        &self,
        id: YellId,
        critic: UserId,
        action: RatingAction,
    ) -> Result<RatingReceipt> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // No-op write to take the lock before reading the current state.
        let locked = sqlx::query("UPDATE yells SET rating_total = rating_total WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();
        if locked == 0 {
            return Err(AppError::not_found("yell", id));
        }

        let current: Option<String> = sqlx::query_scalar(
            "SELECT value FROM ratings WHERE owning_yell_id = ? AND critic_id = ?",
        )
        .bind(id.0)
        .bind(critic.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let current = current.map(|v| v.parse::<RatingValue>()).transpose()?;
        let transition = RatingState::from(current).apply(action);

        match transition.row_write() {
            RowWrite::Keep => {}
            RowWrite::Insert(value) => {
                sqlx::query(
                    "INSERT INTO ratings (owning_yell_id, critic_id, value) VALUES (?, ?, ?)",
                )
                .bind(id.0)
                .bind(critic.0)
                .bind(value.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| match db_err(e) {
                    AppError::Conflict(msg) => {
                        error!(yell_id = %id, critic_id = %critic, "second rating row attempted");
                        AppError::Conflict(msg)
                    }
                    other => other,
                })?;
            }
            RowWrite::Update(value) => {
                sqlx::query(
                    "UPDATE ratings SET value = ? WHERE owning_yell_id = ? AND critic_id = ?",
                )
                .bind(value.as_str())
                .bind(id.0)
                .bind(critic.0)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        if transition.delta != 0 {
            sqlx::query("UPDATE yells SET rating_total = rating_total + ? WHERE id = ?")
                .bind(transition.delta)
                .bind(id.0)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        let rating_total: i64 = sqlx::query_scalar("SELECT rating_total FROM yells WHERE id = ?")
            .bind(id.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(RatingReceipt {
            yell_id: id,
            critic_id: critic,
            transition,
            rating_total,
        })
    }

    async fn insert_report(&self, report: &NewReport) -> Result<ReportId> {
        let id = sqlx::query(
            "INSERT INTO reports (owning_yell_id, reporter_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(report.owning_yell_id.0)
        .bind(report.reporter_id.0)
        .bind(&report.content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_rowid();
        Ok(ReportId(id))
    }

    /// One statement, so the snapshot is consistent as of its start.
    async fn search_snapshot(&self) -> Result<Vec<SearchCandidate>> {
        let rows = sqlx::query(
            "SELECT y.id, y.title, y.kind, y.created_at, y.rating_total, u.username, \
                    p.description, p.code, p.filename, r.content AS request_content \
             FROM yells y \
             JOIN users u ON u.id = y.author_id \
             LEFT JOIN posts p ON p.yell_id = y.id \
             LEFT JOIN requests r ON r.yell_id = y.id \
             ORDER BY y.id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let id = YellId(row.try_get("id").map_err(db_err)?);
                let kind: YellKind = row.try_get::<String, _>("kind").map_err(db_err)?.parse()?;
                let body = match kind {
                    YellKind::Post => CandidateBody::Post {
                        description: extension_column(row, "description", id, kind)?,
                        code: extension_column(row, "code", id, kind)?,
                        filename: extension_column(row, "filename", id, kind)?,
                    },
                    YellKind::Request => CandidateBody::Request {
                        content: extension_column(row, "request_content", id, kind)?,
                    },
                    YellKind::Comment => CandidateBody::Comment,
                };
                Ok(SearchCandidate {
                    id,
                    title: row.try_get("title").map_err(db_err)?,
                    author_name: row.try_get("username").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                    rating_total: row.try_get("rating_total").map_err(db_err)?,
                    body,
                })
            })
            .collect()
    }
}
