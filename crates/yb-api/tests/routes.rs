use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use yb_api::middleware::IDENTITY_HEADER;
use yb_api::{router, AppState};
use yb_db_sqlite::SqliteContentRepo;

async fn app() -> Router {
    let repo = SqliteContentRepo::new("sqlite::memory:").await.unwrap();
    router(AppState::new(Arc::new(repo)))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header(IDENTITY_HEADER, id.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Extractor rejections answer in plain text.
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn register(app: &Router, name: &str) -> i64 {
    let body = json!({ "username": name });
    let (status, body) = call(app, "POST", "/api/users", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn post(app: &Router, author: i64, title: &str) -> i64 {
    let (status, body) = call(
        app,
        "POST",
        "/api/posts",
        Some(author),
        Some(json!({
            "title": title,
            "description": "prints a greeting",
            "code": "fn main() {}",
            "filename": "main.rs",
            "tags": ["rust"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_and_read_post() {
    let app = app().await;
    let author = register(&app, "ferris").await;
    let id = post(&app, author, "Hello world").await;

    let (status, body) = call(&app, "GET", &format!("/api/content/posts/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["yell"]["title"], "Hello world");
    assert_eq!(body["yell"]["rating_total"], 0);
    assert_eq!(body["extension"]["filename"], "main.rs");

    let (status, tags) = call(&app, "GET", &format!("/api/yells/{id}/tags"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags[0]["content"], "rust");
}

#[tokio::test]
async fn test_wrong_kind_is_not_found() {
    let app = app().await;
    let author = register(&app, "ferris").await;
    let id = post(&app, author, "Hello world").await;

    let uri = format!("/api/content/requests/{id}");
    let (status, body) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, "GET", "/api/content/threads/latest", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anonymous_writes_are_rejected() {
    let app = app().await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/requests",
        None,
        Some(json!({ "title": "Need help", "content": "with lifetimes" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rating_cycle_over_http() {
    let app = app().await;
    let author = register(&app, "ferris").await;
    let critic = register(&app, "crab").await;
    let id = post(&app, author, "Hello world").await;

    let unlike = format!("/api/yells/{id}/unlike");
    let (_, body) = call(&app, "POST", &unlike, Some(critic), None).await;
    assert_eq!(body["outcome"], "false_unlike");
    assert_eq!(body["warning"], true);
    assert_eq!(body["rating_total"], 0);

    let (_, body) = call(&app, "POST", &format!("/api/yells/{id}/like"), Some(critic), None).await;
    assert_eq!(body["outcome"], "liked");
    assert_eq!(body["rating_total"], 1);

    let (_, body) = call(&app, "POST", &format!("/api/yells/{id}/like"), Some(critic), None).await;
    assert_eq!(body["outcome"], "already_liked");
    assert_eq!(body["rating_total"], 1);

    let (_, body) = call(&app, "GET", &format!("/api/yells/{id}/rating"), Some(critic), None).await;
    assert_eq!(body["rated"], true);

    let (status, _) = call(&app, "POST", "/api/yells/999/like", Some(critic), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_bump_the_counter() {
    let app = app().await;
    let author = register(&app, "ferris").await;
    let id = post(&app, author, "Hello world").await;

    let uri = format!("/api/yells/{id}/comments");
    let first = json!({ "content": "first" });
    let (status, body) = call(&app, "POST", &uri, Some(author), Some(first)).await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["id"].as_i64().unwrap();

    let (status, thread) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["comments"].as_array().unwrap().len(), 1);

    let (_, content) = call(&app, "GET", &format!("/api/content/posts/{id}"), None, None).await;
    assert_eq!(content["yell"]["comment_count"], 1);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/yells/{comment_id}/comments"),
        Some(author),
        Some(json!({ "content": "nested" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_the_author_resolves_a_request() {
    let app = app().await;
    let author = register(&app, "ferris").await;
    let other = register(&app, "crab").await;
    let (_, body) = call(
        &app,
        "POST",
        "/api/requests",
        Some(author),
        Some(json!({ "title": "Need help", "content": "with lifetimes" })),
    )
    .await;
    let id = body["id"].as_i64().unwrap();
    let uri = format!("/api/requests/{id}/resolved");

    let resolve = json!({ "resolved": true });
    let (status, _) = call(&app, "POST", &uri, Some(other), Some(resolve.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "POST", &uri, Some(author), Some(resolve)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, content) = call(&app, "GET", &format!("/api/content/requests/{id}"), None, None).await;
    assert_eq!(content["extension"]["resolved"], true);
}

#[tokio::test]
async fn test_listings_honour_pagination() {
    let app = app().await;
    let author = register(&app, "ferris").await;
    for title in ["First post", "Second post", "Third post"] {
        post(&app, author, title).await;
    }

    let (status, body) = call(&app, "GET", "/api/content/posts/latest?limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|y| y["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Third post", "Second post"]);

    let (_, body) = call(&app, "GET", "/api/content/posts/top?offset=2", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = app().await;
    register(&app, "ferris").await;
    let body = json!({ "username": "Ferris" });
    let (status, _) = call(&app, "POST", "/api/users", None, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_search_route_requires_a_websocket_upgrade() {
    let app = app().await;
    let (status, _) = call(&app, "GET", "/yell/search/binary", None, None).await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::NOT_FOUND);
}
