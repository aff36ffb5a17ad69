//! # AppError
//!
//! Centralized error handling for the yellboard ecosystem.
//! Maps content-graph failures to actionable error types.

use thiserror::Error;

/// The primary error type for all yb-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Referenced entity is absent (e.g., Yell, CommentSet, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Input broke a validation rule; the message names the rule
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Caller is anonymous or does not own the entity it tries to change
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Uniqueness invariant violated (e.g., duplicate username, second Rating row)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, migration failed)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound(entity.to_string(), id.to_string())
    }

    pub fn validation(rule: impl Into<String>) -> Self {
        AppError::ValidationError(rule.into())
    }
}

/// A specialized Result type for yellboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
