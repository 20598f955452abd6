use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use breakout_core::api_types::{
    processed_message, ExtractRequest, RunListResponse, RunState, RunStatus, RunSummary,
    RunTriggerResponse,
};
use breakout_core::BreakoutError;

use crate::handlers::extract::{error_response, prepare};
use crate::state::AppState;
use crate::tracker::RunTracker;

/// POST /api/runs — start a run in the background.
/// Returns 202 Accepted immediately with a run_id to poll.
pub async fn start_run(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let prepared = match prepare(req) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!(error = %e, "Rejected run request");
            return error_response(e);
        }
    };

    let run_id = Uuid::new_v4().to_string();
    let total_entities = prepared.entities.len();
    let run_status = RunStatus {
        run_id: run_id.clone(),
        status: RunState::Running,
        prompt: prepared.prompt.as_str().to_string(),
        started_at: Utc::now(),
        finished_at: None,
        total_entities,
        progress: 0.0,
        errors: Vec::new(),
        records: Vec::new(),
        message: None,
    };

    let max_retained = state.config.max_retained_runs;
    {
        let mut runs = state.runs.write().await;
        runs.push(run_status);
        evict_finished(&mut runs, max_retained);
    }
    info!(run_id = %run_id, entities = total_entities, "Run started");

    let runs = state.runs.clone();
    let orchestrator = state.orchestrator.clone();
    let tracker = Arc::new(RunTracker::new(run_id.clone(), runs.clone()));
    let run_id_clone = run_id.clone();

    tokio::spawn(async move {
        // Run the work in its own task so a panicking adapter still leaves
        // the run in a terminal state.
        let outcome = tokio::spawn(async move {
            orchestrator
                .process_entities(&prepared.entities, &prepared.prompt, tracker)
                .await
        })
        .await;

        let mut runs_lock = runs.write().await;
        if let Some(run) = runs_lock.iter_mut().find(|r| r.run_id == run_id_clone) {
            run.finished_at = Some(Utc::now());
            match outcome {
                Ok(results) => {
                    run.status = RunState::Completed;
                    run.progress = 1.0;
                    run.message = Some(processed_message(results.len()));
                    run.records = results.into_records();
                    info!(
                        run_id = %run_id_clone,
                        records = run.records.len(),
                        errors = run.errors.len(),
                        "Run completed"
                    );
                }
                Err(e) => {
                    error!(run_id = %run_id_clone, error = %e, "Run aborted");
                    run.status = RunState::Failed;
                    run.errors.push(format!("Run aborted: {e}"));
                }
            }
        }
        evict_finished(&mut runs_lock, max_retained);
    });

    (
        StatusCode::ACCEPTED,
        Json(RunTriggerResponse {
            run_id,
            total_entities,
            status: RunState::Running,
            message: "Run started, processing in background".to_string(),
        }),
    )
        .into_response()
}

/// Drops the oldest finished runs until at most `max_retained` remain.
/// Running runs are never evicted, so the list can briefly exceed the cap.
fn evict_finished(runs: &mut Vec<RunStatus>, max_retained: usize) {
    let mut excess = runs.len().saturating_sub(max_retained);
    if excess == 0 {
        return;
    }
    runs.retain(|run| {
        if excess > 0 && run.status.is_finished() {
            excess -= 1;
            false
        } else {
            true
        }
    });
}

/// GET /api/runs — list all runs, newest first.
pub async fn list_runs(State(state): State<AppState>) -> impl IntoResponse {
    let runs = state.runs.read().await;
    let summaries: Vec<RunSummary> = runs.iter().rev().map(RunSummary::from).collect();
    (StatusCode::OK, Json(RunListResponse { runs: summaries }))
}

/// GET /api/runs/{id} — progress, reported errors, and records once complete.
pub async fn get_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let runs = state.runs.read().await;
    match runs.iter().find(|r| r.run_id == run_id) {
        Some(run) => (StatusCode::OK, Json(run.clone())).into_response(),
        None => error_response(BreakoutError::NotFound(format!("run '{run_id}'"))),
    }
}
