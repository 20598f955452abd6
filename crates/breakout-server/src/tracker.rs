use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use breakout_core::api_types::RunStatus;
use breakout_core::{Progress, RunObserver};

/// Mirrors a background run's progress and errors into the shared run list,
/// where `GET /api/runs/{id}` picks them up.
pub struct RunTracker {
    run_id: String,
    runs: Arc<RwLock<Vec<RunStatus>>>,
}

impl RunTracker {
    pub fn new(run_id: String, runs: Arc<RwLock<Vec<RunStatus>>>) -> Self {
        Self { run_id, runs }
    }
}

#[async_trait]
impl RunObserver for RunTracker {
    async fn progress(&self, progress: Progress) {
        debug!(run_id = %self.run_id, current = progress.current, total = progress.total, "Run progress");
        let mut runs = self.runs.write().await;
        if let Some(run) = runs.iter_mut().find(|r| r.run_id == self.run_id) {
            run.progress = progress.fraction();
        }
    }

    async fn error(&self, message: String) {
        warn!(run_id = %self.run_id, %message, "Run reported an error");
        let mut runs = self.runs.write().await;
        if let Some(run) = runs.iter_mut().find(|r| r.run_id == self.run_id) {
            run.errors.push(message);
        }
    }
}

/// Collects errors for a request-scoped run so they can be returned inline.
#[derive(Default)]
pub struct ErrorCollector {
    errors: Mutex<Vec<String>>,
}

impl ErrorCollector {
    pub async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.errors.lock().await)
    }
}

#[async_trait]
impl RunObserver for ErrorCollector {
    async fn progress(&self, progress: Progress) {
        debug!(current = progress.current, total = progress.total, "Run progress");
    }

    async fn error(&self, message: String) {
        warn!(%message, "Run reported an error");
        self.errors.lock().await.push(message);
    }
}
