use std::sync::Arc;

use tokio::sync::RwLock;

use breakout_core::api_types::RunStatus;
use breakout_core::AppConfig;
use breakout_pipeline::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub runs: Arc<RwLock<Vec<RunStatus>>>,
}

impl AppState {
    pub fn new(config: AppConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            runs: Arc::new(RwLock::new(Vec::new())),
        }
    }
}
