use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use breakout_core::api_types::{processed_message, ExtractRequest, ExtractResponse};
use breakout_core::{BreakoutError, EntityName, PromptTemplate, Result};

use crate::state::AppState;
use crate::tracker::ErrorCollector;

/// A validated request, ready to hand to the orchestrator.
pub struct PreparedRun {
    pub entities: Vec<EntityName>,
    pub skipped: usize,
    pub prompt: PromptTemplate,
}

/// Parses the template and drops blank entity names.
pub fn prepare(req: ExtractRequest) -> Result<PreparedRun> {
    let prompt = PromptTemplate::parse(req.prompt)?;
    let submitted = req.entities.len();
    let entities: Vec<EntityName> = req
        .entities
        .into_iter()
        .filter_map(|name| EntityName::new(name).ok())
        .collect();
    let skipped = submitted - entities.len();
    if skipped > 0 {
        warn!(skipped, submitted, "Dropped blank entity names");
    }

    Ok(PreparedRun {
        entities,
        skipped,
        prompt,
    })
}

pub fn error_response(err: BreakoutError) -> Response {
    let status = match &err {
        BreakoutError::Template(_) | BreakoutError::Entity(_) => StatusCode::BAD_REQUEST,
        BreakoutError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

/// POST /api/extract — process the entities and return the records inline.
pub async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let prepared = match prepare(req) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!(error = %e, "Rejected extraction request");
            return error_response(e);
        }
    };
    info!(entities = prepared.entities.len(), "Running extraction request");

    let collector = Arc::new(ErrorCollector::default());
    let results = state
        .orchestrator
        .process_entities(&prepared.entities, &prepared.prompt, collector.clone())
        .await;

    let processed = results.len();
    let response = ExtractResponse {
        records: results.into_records(),
        processed,
        skipped: prepared.skipped,
        errors: collector.take().await,
        message: processed_message(processed),
    };

    (StatusCode::OK, Json(response)).into_response()
}
