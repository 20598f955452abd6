use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BreakoutError, Result};

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://serpapi.com/search";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "mixtral-8x7b-32768";
pub const DEFAULT_PACING_MS: u64 = 500;
pub const DEFAULT_MAX_RETAINED_RUNS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub serpapi_api_key: String,
    pub groq_api_key: String,
    pub search_endpoint: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub pacing_ms: u64,
    pub max_concurrency: usize,
    /// Finished background runs kept for polling; older ones are evicted.
    pub max_retained_runs: usize,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            serpapi_api_key: std::env::var("SERPAPI_API_KEY").unwrap_or_default(),
            groq_api_key: std::env::var("GROQ_API_KEY").unwrap_or_default(),
            search_endpoint: std::env::var("SEARCH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SEARCH_ENDPOINT.into()),
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.into()),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.into()),
            pacing_ms: std::env::var("PACING_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PACING_MS),
            max_concurrency: std::env::var("MAX_CONCURRENCY")
                .ok()
                .and_then(|c| c.parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(1),
            max_retained_runs: std::env::var("MAX_RETAINED_RUNS")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_RETAINED_RUNS),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Names of the credential variables that are unset or blank.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.serpapi_api_key.trim().is_empty() {
            missing.push("SERPAPI_API_KEY");
        }
        if self.groq_api_key.trim().is_empty() {
            missing.push("GROQ_API_KEY");
        }
        missing
    }

    /// Checks that both provider endpoints are absolute http(s) URLs.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("SEARCH_ENDPOINT", &self.search_endpoint),
            ("LLM_BASE_URL", &self.llm_base_url),
        ] {
            let url = Url::parse(value)
                .map_err(|e| BreakoutError::Config(format!("{name} is not a valid URL: {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(BreakoutError::Config(format!(
                    "{name} must use http or https, got {}",
                    url.scheme()
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(BreakoutError::Config("MAX_CONCURRENCY must be at least 1".into()));
        }
        if self.max_retained_runs == 0 {
            return Err(BreakoutError::Config("MAX_RETAINED_RUNS must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serpapi_api_key: String::new(),
            groq_api_key: String::new(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.into(),
            llm_base_url: DEFAULT_LLM_BASE_URL.into(),
            llm_model: DEFAULT_LLM_MODEL.into(),
            pacing_ms: DEFAULT_PACING_MS,
            max_concurrency: 1,
            max_retained_runs: DEFAULT_MAX_RETAINED_RUNS,
            server_host: "0.0.0.0".into(),
            server_port: 8080,
        }
    }
}
