//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{connections, insights, matches, status};
use crate::server::middleware::request_context_middleware;
use crate::server::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    // Matching endpoints
    .route("/matches/{user_id}", get(matches::get_matches))
    .route("/find_friend/{user_id}", post(matches::find_friend))
    .route("/find_groups/{user_id}", post(matches::find_groups))
    // Connection lifecycle
    .route("/connections/{id}", get(connections::get_connection))
    .route("/connections/{id}/accept", post(connections::accept_connection))
    // Insight pipeline
    .route("/add_ai_insight/{user_id}", post(insights::add_ai_insight))
    .layer(middleware::from_fn(request_context_middleware))
    .with_state(state)
}
