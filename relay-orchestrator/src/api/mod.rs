//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod grant;
pub mod health;
pub mod run;
pub mod unit;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Release intake
        .route("/pipeline/trigger", post(run::trigger_release))
        .route("/webhook/github", post(webhook::github_push))
        // Run history
        .route("/run/list", get(run::list_runs))
        .route("/run/{id}", get(run::get_run))
        .route("/run/{id}/logs", get(run::get_run_logs))
        // Provisioned state
        .route("/grants", get(grant::list_grants))
        .route("/unit/list", get(unit::list_units))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
