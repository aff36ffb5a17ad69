//! Boundary checks run before any transaction opens.
//!
//! Lengths are counted in `char`s. Failures carry the violated rule verbatim.

use crate::error::{AppError, Result};
use crate::models::{NewComment, NewPost, NewReport, NewRequest};

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_CHARS: usize = 30;

pub const TITLE_CHARS: (usize, usize) = (3, 100);
pub const DESCRIPTION_CHARS: (usize, usize) = (3, 1000);
pub const FILENAME_CHARS: (usize, usize) = (3, 50);
pub const REQUEST_CHARS: (usize, usize) = (3, 5000);
pub const COMMENT_CHARS: (usize, usize) = (3, 1000);
pub const REPORT_CHARS: (usize, usize) = (3, 1000);
pub const USERNAME_CHARS: (usize, usize) = (4, 50);

fn bounded(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{field} must be at least {min} characters long and a maximum of {max}"
        )));
    }
    Ok(())
}

/// Trims every tag and enforces the creation-time caps.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    if tags.len() > MAX_TAGS {
        return Err(AppError::validation(format!(
            "a yell may carry at most {MAX_TAGS} tags"
        )));
    }
    tags.iter()
        .map(|tag| {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(AppError::validation("tags must not be blank"));
            }
            if tag.chars().count() > MAX_TAG_CHARS {
                return Err(AppError::validation(format!(
                    "tags must be a maximum of {MAX_TAG_CHARS} characters"
                )));
            }
            Ok(tag.to_string())
        })
        .collect()
}

/// Returns the canonical (lowercased) username.
pub fn username(raw: &str) -> Result<String> {
    bounded("username", raw, USERNAME_CHARS)?;
    if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::validation(
            "usernames must only contain English characters or numbers",
        ));
    }
    Ok(raw.to_ascii_lowercase())
}

pub fn post(post: &NewPost) -> Result<NewPost> {
    bounded("title", &post.title, TITLE_CHARS)?;
    bounded("description", &post.description, DESCRIPTION_CHARS)?;
    bounded("filename", &post.filename, FILENAME_CHARS)?;
    if post.code.trim().is_empty() {
        return Err(AppError::validation("code must not be empty"));
    }
    Ok(NewPost {
        tags: normalize_tags(&post.tags)?,
        ..post.clone()
    })
}

pub fn request(request: &NewRequest) -> Result<NewRequest> {
    bounded("title", &request.title, TITLE_CHARS)?;
    bounded("content", &request.content, REQUEST_CHARS)?;
    Ok(NewRequest {
        tags: normalize_tags(&request.tags)?,
        ..request.clone()
    })
}

pub fn comment(comment: &NewComment) -> Result<()> {
    bounded("comment", &comment.content, COMMENT_CHARS)
}

pub fn report(report: &NewReport) -> Result<()> {
    bounded("report", &report.content, REPORT_CHARS)
}
