//! # yb-api
//!
//! The web routing and orchestration layer for yellboard.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod search;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use yb_core::{CommentEngine, ContentRepo, ContentStore, RatingEngine, SearchService};

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: ContentStore,
    pub ratings: RatingEngine,
    pub comments: CommentEngine,
    pub search: SearchService,
}

impl AppState {
    pub fn new(repo: Arc<dyn ContentRepo>) -> Self {
        Self {
            store: ContentStore::new(repo.clone()),
            ratings: RatingEngine::new(repo.clone()),
            comments: CommentEngine::new(repo.clone()),
            search: SearchService::new(repo),
        }
    }
}

/// Builds the full application router.
///
/// Kind-scoped reads live under `/api/content/{kind}` so the kind segment
/// never competes with the fixed `/api/yells` and `/api/users` prefixes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(handlers::register))
        .route("/api/users/{id}", get(handlers::get_user))
        .route("/api/posts", post(handlers::create_post))
        .route("/api/requests", post(handlers::create_request))
        .route("/api/requests/{id}/resolved", post(handlers::set_resolved))
        .route("/api/content/{kind}/latest", get(handlers::latest))
        .route("/api/content/{kind}/top", get(handlers::top_rated))
        .route("/api/content/{kind}/{id}", get(handlers::get_content))
        .route("/api/yells/{id}/tags", get(handlers::tags))
        .route(
            "/api/yells/{id}/comments",
            get(handlers::comments).post(handlers::post_comment),
        )
        .route("/api/yells/{id}/rating", get(handlers::rating_status))
        .route("/api/yells/{id}/like", post(handlers::like))
        .route("/api/yells/{id}/unlike", post(handlers::unlike))
        .route("/api/yells/{id}/report", post(handlers::report))
        .route("/yell/search/{query}", get(search::search_socket))
        .layer(middleware::cors_policy())
        .layer(middleware::standard_middleware())
        .with_state(state)
}
