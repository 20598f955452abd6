use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use breakout_core::api_types::HealthResponse;

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("Health check requested");

    let missing_credentials: Vec<String> = state
        .config
        .missing_credentials()
        .into_iter()
        .map(String::from)
        .collect();

    let status = if missing_credentials.is_empty() {
        "ok".to_string()
    } else {
        "degraded".to_string()
    };

    let response = HealthResponse {
        status,
        version: VERSION.to_string(),
        search_provider: state.orchestrator.search_provider().name().to_string(),
        extractor: state.orchestrator.extractor().name().to_string(),
        missing_credentials,
    };

    (StatusCode::OK, Json(response))
}
