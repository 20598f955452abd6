use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{ExtractionRecord, DEFAULT_PROMPT};

// --- Health ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub search_provider: String,
    pub extractor: String,
    pub missing_credentials: Vec<String>,
}

// --- Extraction ---

/// Body of `POST /api/extract` and `POST /api/runs`.
///
/// Entities arrive as raw strings; blank entries are dropped before the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub entities: Vec<String>,
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub records: Vec<ExtractionRecord>,
    pub processed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub message: String,
}

// --- Runs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct RunTriggerResponse {
    pub run_id: String,
    pub total_entities: usize,
    pub status: RunState,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: String,
    pub status: RunState,
    pub prompt: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_entities: usize,
    pub progress: f64,
    pub errors: Vec<String>,
    pub records: Vec<ExtractionRecord>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Completed,
    /// The run's worker died before producing a result set.
    Failed,
}

impl RunState {
    pub fn is_finished(self) -> bool {
        !matches!(self, RunState::Running)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunListResponse {
    pub runs: Vec<RunSummary>,
}

/// A run without its records, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_entities: usize,
    pub progress: f64,
    pub error_count: usize,
}

impl From<&RunStatus> for RunSummary {
    fn from(run: &RunStatus) -> Self {
        Self {
            run_id: run.run_id.clone(),
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            total_entities: run.total_entities,
            progress: run.progress,
            error_count: run.errors.len(),
        }
    }
}

/// Summary line shown once a batch finishes.
pub fn processed_message(count: usize) -> String {
    format!("Processed {count} entities.")
}
