//! # yb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! services. Inputs are expected to be sanitized by the caller already.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use yb_core::{
    CommentThread, Content, NewPost, NewReport, NewRequest, Page, RatingOutcome, RatingReceipt,
    RatingState, ReportId, Tag, User, UserId, Yell, YellId, YellKind,
};

use crate::error::ApiError;
use crate::middleware::Caller;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostBody {
    pub title: String,
    pub description: String,
    pub code: String,
    pub filename: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub resolved: bool,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<Pagination> for Page {
    fn from(p: Pagination) -> Self {
        let default = Page::default();
        Page::new(p.limit.unwrap_or(default.limit), p.offset.unwrap_or(0))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Created<T> {
    pub id: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingResponse {
    pub yell_id: YellId,
    pub state: RatingState,
    pub outcome: RatingOutcome,
    /// True for the no-op outcomes (already liked, false unlike, ...)
    pub warning: bool,
    pub rating_total: i64,
}

impl From<RatingReceipt> for RatingResponse {
    fn from(r: RatingReceipt) -> Self {
        Self {
            yell_id: r.yell_id,
            state: r.transition.next,
            outcome: r.transition.outcome,
            warning: r.transition.outcome.is_warning(),
            rating_total: r.rating_total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: RatingState,
    pub rated: bool,
}

fn parse_kind(raw: &str) -> ApiResult<YellKind> {
    Ok(raw.parse::<YellKind>()?)
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(StatusCode, Json<Created<UserId>>)> {
    let id = state.store.register_user(&body.username).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.store.get_user(UserId(id)).await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreatePostBody>,
) -> ApiResult<(StatusCode, Json<Created<YellId>>)> {
    let post = NewPost {
        author_id: caller.require()?,
        title: body.title,
        description: body.description,
        code: body.code,
        filename: body.filename,
        tags: body.tags,
    };
    let id = state.store.create_post(&post).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn create_request(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateRequestBody>,
) -> ApiResult<(StatusCode, Json<Created<YellId>>)> {
    let request = NewRequest {
        author_id: caller.require()?,
        title: body.title,
        content: body.content,
        tags: body.tags,
    };
    let id = state.store.create_request(&request).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn get_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<Json<Content>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.store.get(YellId(id), kind).await?))
}

pub async fn latest(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Yell>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.store.get_latest(kind, page.into()).await?))
}

pub async fn top_rated(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Yell>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.store.get_top_rated(kind, page.into()).await?))
}

pub async fn tags(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.store.tags(YellId(id)).await?))
}

pub async fn comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CommentThread>> {
    Ok(Json(state.store.comments(YellId(id)).await?))
}

pub async fn post_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<TextBody>,
) -> ApiResult<(StatusCode, Json<Created<YellId>>)> {
    let author = caller.require()?;
    let id = state
        .comments
        .post_comment(author, YellId(id), &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn rating_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<StatusResponse>> {
    let critic = caller.require()?;
    let current = state.ratings.status(YellId(id), critic).await?;
    Ok(Json(StatusResponse {
        state: current,
        rated: current.is_set(),
    }))
}

pub async fn like(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<RatingResponse>> {
    let critic = caller.require()?;
    Ok(Json(state.ratings.like(YellId(id), critic).await?.into()))
}

pub async fn unlike(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<RatingResponse>> {
    let critic = caller.require()?;
    Ok(Json(state.ratings.unlike(YellId(id), critic).await?.into()))
}

pub async fn report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<TextBody>,
) -> ApiResult<(StatusCode, Json<Created<ReportId>>)> {
    let report = NewReport {
        owning_yell_id: YellId(id),
        reporter_id: caller.require()?,
        content: body.content,
    };
    let id = state.store.report(&report).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn set_resolved(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(body): Json<ResolveBody>,
) -> ApiResult<StatusCode> {
    let actor = caller.require()?;
    state
        .store
        .set_resolved(YellId(id), actor, body.resolved)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
