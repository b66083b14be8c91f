use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, FetchError},
    middleware::RequestId,
    models::{Candidate, SearchPage, TitleDetails},
    services::{
        browse::CategoryPage, session::SessionSnapshot, trailer::TrailerOutcome,
        trigger::TriggerState,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    /// Overrides the configured genre filter for this request
    pub category: Option<String>,
}

/// Title details plus the outbound IMDb link
#[derive(Debug, Serialize)]
pub struct TitleResponse {
    #[serde(flatten)]
    pub details: TitleDetails,
    pub imdb_url: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelatedStatus {
    Ready,
    Empty,
    NotApplicable,
}

#[derive(Debug, Serialize)]
pub struct RelatedResponse {
    pub title_id: String,
    pub status: RelatedStatus,
    pub items: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub trigger: TriggerState,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// One page of title search results
pub async fn search_titles(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchPage>> {
    let page = state
        .services
        .catalog
        .search(&params.q, params.page.unwrap_or(1), &CancellationToken::new())
        .await?;
    Ok(Json(page))
}

pub async fn get_title(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TitleResponse>> {
    let details = state
        .services
        .catalog
        .detail(&id, &CancellationToken::new())
        .await?;
    let imdb_url = details.imdb_url(&state.imdb_base_url);
    Ok(Json(TitleResponse { details, imdb_url }))
}

/// Related titles for one title, outside of any view session
pub async fn related_titles(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(params): Query<RelatedQuery>,
) -> AppResult<Json<RelatedResponse>> {
    let cancel = CancellationToken::new();
    let source = state.services.catalog.detail(&id, &cancel).await?;

    let phrases = match state.services.deriver.derive(&source) {
        Ok(phrases) => phrases,
        Err(FetchError::NotApplicable) => {
            tracing::info!(request_id = %request_id, title_id = %id, "No related titles applicable");
            return Ok(Json(RelatedResponse {
                title_id: source.id,
                status: RelatedStatus::NotApplicable,
                items: Vec::new(),
            }));
        }
        Err(e) => return Err(e.into()),
    };

    let category = params
        .category
        .map(|category| category.trim().to_string())
        .filter(|category| !category.is_empty());
    let result = match category {
        Some(category) => {
            state
                .services
                .related
                .with_category(Some(category))
                .aggregate(&source, &phrases, &cancel)
                .await
        }
        None => {
            state
                .services
                .related
                .aggregate(&source, &phrases, &cancel)
                .await
        }
    };

    // Every phrase search failing leaves the list empty rather than failing the request
    let items = match result {
        Ok(items) => items,
        Err(FetchError::Canceled) => return Err(AppError::Canceled),
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                title_id = %id,
                error = %e,
                "Related titles unavailable"
            );
            Vec::new()
        }
    };

    tracing::info!(
        request_id = %request_id,
        title_id = %id,
        related = items.len(),
        "Related titles served"
    );

    let status = if items.is_empty() {
        RelatedStatus::Empty
    } else {
        RelatedStatus::Ready
    };
    Ok(Json(RelatedResponse {
        title_id: source.id,
        status,
        items,
    }))
}

pub async fn browse_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<CategoryPage>> {
    let page = state
        .browser
        .browse(&category, params.page.unwrap_or(1), &CancellationToken::new())
        .await?;
    Ok(Json(page))
}

/// Open a new view session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let session = state.open_session().await;
    tracing::info!(session = %session.id(), "Session opened");
    (StatusCode::CREATED, Json(session.snapshot()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.session(session_id).await?;
    Ok(Json(session.snapshot()))
}

/// Show a title in the session; related titles start loading in the background
pub async fn navigate_session(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((session_id, title_id)): Path<(Uuid, String)>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.session(session_id).await?;
    session.navigate(&title_id).await?;

    tracing::info!(
        request_id = %request_id,
        session = %session_id,
        title_id = %title_id,
        "Session navigated"
    );

    Ok(Json(session.snapshot()))
}

/// The related-titles area scrolled into view
pub async fn session_visible(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<VisibilityResponse>> {
    let session = state.session(session_id).await?;
    Ok(Json(VisibilityResponse {
        trigger: session.notify_visible(),
    }))
}

pub async fn play_trailer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<TrailerOutcome>> {
    let session = state.session(session_id).await?;
    let outcome = session.play_trailer().await?;
    Ok(Json(outcome))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionSnapshot>> {
    let session = state.session(session_id).await?;
    session.sign_in();
    Ok(Json(session.snapshot()))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.close_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
