//! yellboard/crates/yb-api/src/middleware.rs Middleware
//!
//! Request logging, CORS, and caller identity.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderName, Method};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use yb_core::{AppError, UserId};

use crate::error::ApiError;

/// Header the fronting auth layer sets to the authenticated user's id.
pub const IDENTITY_HEADER: HeaderName = HeaderName::from_static("x-yell-user");

// Returns the standard request logger for the yellboard API.
pub fn standard_middleware() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

// Configures CORS (Cross-Origin Resource Sharing)
// Important if the UI and API ever live on different subdomains.
pub fn cors_policy() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}

/// Identity resolved by the auth layer, or anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Option<UserId>);

impl Caller {
    pub fn require(self) -> Result<UserId, ApiError> {
        self.0
            .ok_or_else(|| ApiError(AppError::Unauthorized("sign in to do that".into())))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(&IDENTITY_HEADER) else {
            return Ok(Caller(None));
        };
        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| Caller(Some(UserId(id))))
            .ok_or_else(|| ApiError(AppError::validation("malformed identity header")))
    }
}
