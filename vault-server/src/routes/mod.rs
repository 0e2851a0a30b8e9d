pub mod files;
pub mod search;
pub mod sse;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router: versioned API routes plus CORS/tracing layers,
/// the way the teacher's `create_app` merges `create_api_router` under
/// outer CORS and `TraceLayer` middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", create_v1_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/files/tree/{vault}", get(files::tree_handler))
        .route("/files/children/{vault}", get(files::children_handler))
        .route("/file/{vault}/{id}", get(files::get_file_handler))
        .route("/file/create", post(files::create_file_handler))
        .route("/search/{vault}", post(search::search_handler))
        .route("/sse/{vault}", get(sse::subscribe_handler))
        .route("/sse/stats", get(sse::stats_handler))
}

async fn health_handler() -> &'static str {
    "ok"
}
