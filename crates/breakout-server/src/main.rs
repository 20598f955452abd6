use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use breakout_core::{AppConfig, BreakoutError};
use breakout_extraction::GroqExtractor;
use breakout_pipeline::{Orchestrator, PipelineOptions};
use breakout_search::SerpApiSearcher;

mod handlers;
mod routes;
mod state;
mod tracker;

use state::AppState;

#[tokio::main]
async fn main() -> breakout_core::Result<()> {
    dotenvy::dotenv().ok();

    let directive: Directive = "breakout=info"
        .parse()
        .map_err(|e| BreakoutError::Config(format!("invalid log directive: {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let config = AppConfig::from_env();
    config.validate()?;
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "Provider credentials not set, searches and extractions will fail softly"
        );
    }

    let orchestrator = Orchestrator::new(
        Arc::new(SerpApiSearcher::from_config(&config)),
        Arc::new(GroqExtractor::from_config(&config)),
        PipelineOptions::from_config(&config),
    );
    tracing::info!(
        model = %config.llm_model,
        pacing_ms = config.pacing_ms,
        max_concurrency = config.max_concurrency,
        "Pipeline configured"
    );

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config, orchestrator);

    let app = routes::create_router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Breakout server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
