use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/api/health", get(handlers::health::health_check))
        // Extraction
        .route("/api/extract", post(handlers::extract::extract))
        // Runs
        .route(
            "/api/runs",
            get(handlers::runs::list_runs).post(handlers::runs::start_run),
        )
        .route("/api/runs/{id}", get(handlers::runs::get_run))
}
