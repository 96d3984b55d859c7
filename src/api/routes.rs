use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_context_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Titles
        .route("/titles/search", get(handlers::search_titles))
        .route("/titles/random", get(handlers::random_title))
        .route("/titles/:id", get(handlers::title_details))
        // Recommendations
        .route("/recommendations", post(handlers::recommend))
        .route("/interactions", post(handlers::record_interaction))
        .route("/quota", get(handlers::quota_status))
}
