//! # Domain Models
//!
//! These structs represent the content graph of yellboard.
//! Every piece of content is a `Yell` (base row) joined to exactly one
//! kind-specific extension row, selected by `Yell::kind`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Server-assigned, monotonically increasing identity of a Yell.
    YellId
);
id_type!(UserId);
id_type!(CommentSetId);
id_type!(ReportId);

/// Closed set of content kinds. Selects which extension row a Yell joins to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YellKind {
    Post,
    Request,
    Comment,
}

impl YellKind {
    pub fn as_str(self) -> &'static str {
        match self {
            YellKind::Post => "post",
            YellKind::Request => "request",
            YellKind::Comment => "comment",
        }
    }

    /// Posts and requests own a CommentSet; comments do not.
    pub fn hosts_discussion(self) -> bool {
        !matches!(self, YellKind::Comment)
    }
}

impl fmt::Display for YellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YellKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" | "posts" => Ok(YellKind::Post),
            "request" | "requests" => Ok(YellKind::Request),
            "comment" | "comments" => Ok(YellKind::Comment),
            other => Err(AppError::validation(format!("unknown yell kind '{other}'"))),
        }
    }
}

/// Minimal identity record. Credentials live with the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// The base content record shared by posts, requests and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Yell {
    pub id: YellId,
    pub author_id: UserId,
    pub title: String,
    pub kind: YellKind,
    pub created_at: DateTime<Utc>,
    /// Number of critics currently liking this Yell
    pub rating_total: i64,
    /// Number of comments appended to this Yell's CommentSet
    pub comment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub base_yell_id: YellId,
    pub description: String,
    pub code: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub base_yell_id: YellId,
    pub content: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSet {
    pub id: CommentSetId,
    pub owning_yell_id: YellId,
}

/// Identity edge: `base_yell_id` is this comment's own Yell.
/// Ownership edge: `comment_set_id` is the discussion it was appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub base_yell_id: YellId,
    pub comment_set_id: CommentSetId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub owning_yell_id: YellId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub owning_yell_id: YellId,
    pub reporter_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Exactly one extension row per Yell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Extension {
    Post(Post),
    Request(Request),
    Comment(Comment),
}

impl Extension {
    pub fn kind(&self) -> YellKind {
        match self {
            Extension::Post(_) => YellKind::Post,
            Extension::Request(_) => YellKind::Request,
            Extension::Comment(_) => YellKind::Comment,
        }
    }
}

/// A Yell joined with its extension row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub yell: Yell,
    pub extension: Extension,
}

/// A CommentSet and its comments in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    pub set: CommentSet,
    pub comments: Vec<(Yell, Comment)>,
}

// Creation inputs. Validated by the services before they reach a repository.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub description: String,
    pub code: String,
    pub filename: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub author_id: UserId,
    pub target: YellId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReport {
    pub owning_yell_id: YellId,
    pub reporter_id: UserId,
    pub content: String,
}

/// Ordering used by the listing reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// id descending
    Latest,
    /// rating_total descending, ties by id descending
    TopRated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset: offset.max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(20, 0)
    }
}
