//! REST API for the matcher, the connection lifecycle and the insight pipeline
//!
//! Uses axum for routing and schemars for response schemas. Every handler
//! reads its collaborators from [`state::AppState`].

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod startup;
pub mod state;
pub mod types;
