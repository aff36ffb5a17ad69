//! Full-scan scoring.
//!
//! Each scored field is compared with the query using a normalized
//! similarity ratio (0 to 100). The i-th field (1-indexed) is weighted by i
//! and the weighted sum is divided by the field count, so later fields
//! (rating, title) pull harder than earlier ones (description, code).

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::YellId;

/// Minimum score for a candidate to be reported.
pub const SCORE_THRESHOLD: f64 = 80.0;

/// Everything the scanner reads about one Yell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: YellId,
    pub title: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub rating_total: i64,
    pub body: CandidateBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CandidateBody {
    Post {
        description: String,
        code: String,
        filename: String,
    },
    Request {
        content: String,
    },
    /// Comments are part of the snapshot but never scored.
    Comment,
}

impl SearchCandidate {
    /// Scored fields in weight order, or `None` for kinds that are not scored.
    pub fn fields(&self) -> Option<Vec<Cow<'_, str>>> {
        let timestamp = Cow::Owned(self.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
        let rating = Cow::Owned(self.rating_total.to_string());
        let author = Cow::Borrowed(self.author_name.as_str());
        let title = Cow::Borrowed(self.title.as_str());

        match &self.body {
            CandidateBody::Post {
                description,
                code,
                filename,
            } => Some(vec![
                Cow::Borrowed(description.as_str()),
                Cow::Borrowed(code.as_str()),
                Cow::Borrowed(filename.as_str()),
                author,
                timestamp,
                rating,
                title,
            ]),
            CandidateBody::Request { content } => Some(vec![
                Cow::Borrowed(content.as_str()),
                author,
                timestamp,
                rating,
                title,
            ]),
            CandidateBody::Comment => None,
        }
    }
}

/// A search query, normalized once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    normalized: Vec<char>,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: normalize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Lowercases and collapses every whitespace run into one space.
fn normalize(s: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(s.len());
    for (i, word) in s.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for lc in long {
        for (j, sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Indel ratio: `200 * lcs / (len_a + len_b)`. Two empty strings are identical.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Symmetric, case and whitespace insensitive similarity in `0.0..=100.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    ratio(&normalize(a), &normalize(b))
}

/// `(Σ similarity_i × i) / n` with `i` starting at 1.
pub fn weighted_score(similarities: &[f64]) -> f64 {
    if similarities.is_empty() {
        return 0.0;
    }
    let sum: f64 = similarities
        .iter()
        .enumerate()
        .map(|(i, s)| s * (i + 1) as f64)
        .sum();
    sum / similarities.len() as f64
}

pub fn score(query: &Query, candidate: &SearchCandidate) -> Option<f64> {
    let fields = candidate.fields()?;
    let similarities: Vec<f64> = fields
        .iter()
        .map(|field| ratio(&query.normalized, &normalize(field)))
        .collect();
    Some(weighted_score(&similarities))
}

pub fn qualifies(score: f64) -> bool {
    score >= SCORE_THRESHOLD
}
