use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{propagate_request_id, request_span};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(middleware::from_fn(propagate_request_id))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/titles/search", get(handlers::search_titles))
        .route("/titles/:id", get(handlers::get_title))
        .route("/titles/:id/related", get(handlers::related_titles))
        .route("/categories/:category", get(handlers::browse_category))
        // View sessions
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route(
            "/sessions/:session_id/title/:title_id",
            put(handlers::navigate_session),
        )
        .route("/sessions/:session_id/visible", post(handlers::session_visible))
        .route("/sessions/:session_id/trailer", post(handlers::play_trailer))
        .route("/sessions/:session_id/sign-in", post(handlers::sign_in))
}
