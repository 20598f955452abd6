use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use breakout_core::config::{AppConfig, DEFAULT_SEARCH_ENDPOINT};
use breakout_core::error::{BreakoutError, Result};
use breakout_core::{EntityName, PromptTemplate, RunObserver, SearchProvider, MAX_SEARCH_RESULTS};

/// Only `organic_results` is read, and loosely: entries of the wrong shape
/// count as results without a snippet instead of failing the whole page.
#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Option<Value>,
}

/// Search Provider Adapter backed by SerpAPI's Google engine.
pub struct SerpApiSearcher {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SerpApiSearcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent("breakout-entity-research/0.1")
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to build configured HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.serpapi_api_key.clone()).with_endpoint(config.search_endpoint.clone())
    }

    /// Point the adapter at a different search endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_snippets(&self, query: &str) -> Result<String> {
        debug!(endpoint = %self.endpoint, query = %query, "Fetching organic results from SerpAPI");

        let num = MAX_SEARCH_RESULTS.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            // The request URL carries the api_key query parameter.
            .map_err(|e| {
                BreakoutError::Search(format!("HTTP request to SerpAPI failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BreakoutError::Search(format!(
                "SerpAPI returned HTTP {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let serp: SerpResponse = response
            .json()
            .await
            .map_err(|e| {
                BreakoutError::Search(format!("Failed to parse SerpAPI response: {}", e.without_url()))
            })?;

        Ok(join_snippets(serp))
    }
}

/// Joins the snippets of the top results with `\n`. Results without a
/// snippet contribute an empty line so ranking positions are preserved.
fn join_snippets(response: SerpResponse) -> String {
    let Some(results) = response.organic_results.as_ref().and_then(Value::as_array) else {
        return String::new();
    };

    results
        .iter()
        .take(MAX_SEARCH_RESULTS)
        .map(|result| result.get("snippet").and_then(Value::as_str).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl SearchProvider for SerpApiSearcher {
    fn name(&self) -> &str {
        "serpapi"
    }

    #[instrument(skip_all, fields(entity = %entity), name = "serpapi_search")]
    async fn search(
        &self,
        entity: &EntityName,
        prompt: &PromptTemplate,
        observer: &dyn RunObserver,
    ) -> String {
        let query = prompt.render(entity);

        match self.fetch_snippets(&query).await {
            Ok(text) => {
                info!(chars = text.len(), "Search complete");
                text
            }
            Err(e) => {
                error!(error = %e, "Web search failed, continuing without results");
                observer.error(format!("Error during web search: {e}")).await;
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use breakout_core::Progress;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        errors: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RunObserver for RecordingObserver {
        async fn progress(&self, _progress: Progress) {}

        async fn error(&self, message: String) {
            self.errors.lock().unwrap().push(message);
        }
    }

    fn parse(value: serde_json::Value) -> SerpResponse {
        serde_json::from_value(value).unwrap()
    }

    fn acme() -> EntityName {
        EntityName::new("Acme Corp").unwrap()
    }

    #[test]
    fn test_join_snippets_missing_snippet_is_empty_line() {
        let response = parse(json!({
            "organic_results": [{"snippet": "a"}, {"snippet": "b"}, {}]
        }));
        assert_eq!(join_snippets(response), "a\nb\n");
    }

    #[test]
    fn test_join_snippets_no_results() {
        assert_eq!(join_snippets(parse(json!({}))), "");
        assert_eq!(join_snippets(parse(json!({"organic_results": null}))), "");
        assert_eq!(join_snippets(parse(json!({"organic_results": []}))), "");
    }

    #[test]
    fn test_join_snippets_tolerates_malformed_entries() {
        let response = parse(json!({
            "organic_results": [
                {"snippet": "Jane Doe runs Acme Corp."},
                {"snippet": 42},
                null,
                "not an object",
                {"snippet": "Acme Corp appoints Jane Doe."}
            ]
        }));
        assert_eq!(
            join_snippets(response),
            "Jane Doe runs Acme Corp.\n\n\n\nAcme Corp appoints Jane Doe."
        );

        let response = parse(json!({"organic_results": {"unexpected": true}}));
        assert_eq!(join_snippets(response), "");
    }

    #[test]
    fn test_join_snippets_caps_at_five_results() {
        let results: Vec<_> = (1..=8).map(|i| json!({"snippet": format!("s{i}")})).collect();
        let response = parse(json!({ "organic_results": results }));
        assert_eq!(join_snippets(response), "s1\ns2\ns3\ns4\ns5");
    }

    #[test]
    fn test_new_searcher() {
        let searcher = SerpApiSearcher::new("key");
        assert_eq!(searcher.name(), "serpapi");
        assert_eq!(searcher.endpoint(), "https://serpapi.com/search");
    }

    #[tokio::test]
    async fn test_search_sends_rendered_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Who is the ceo of Acme Corp?"))
            .and(query_param("api_key", "serp-key"))
            .and(query_param("num", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_metadata": {"status": "Success"},
                "organic_results": [
                    {"position": 1, "snippet": "Jane Doe is the CEO of Acme Corp."},
                    {"position": 2, "title": "Acme Corp - Wikipedia"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let searcher =
            SerpApiSearcher::new("serp-key").with_endpoint(format!("{}/search", server.uri()));
        let observer = RecordingObserver::default();
        let text = searcher
            .search(&acme(), &PromptTemplate::default(), &observer)
            .await;

        assert_eq!(text, "Jane Doe is the CEO of Acme Corp.\n");
        assert!(observer.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_http_error_is_soft() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key."))
            .mount(&server)
            .await;

        let searcher =
            SerpApiSearcher::new("bad-key").with_endpoint(format!("{}/search", server.uri()));
        let observer = RecordingObserver::default();
        let text = searcher
            .search(&acme(), &PromptTemplate::default(), &observer)
            .await;

        assert_eq!(text, "");
        let errors = observer.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error during web search:"));
        assert!(errors[0].contains("401"));
    }

    #[tokio::test]
    async fn test_search_undecodable_body_is_soft() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let searcher = SerpApiSearcher::new("key").with_endpoint(server.uri());
        let observer = RecordingObserver::default();
        let text = searcher
            .search(&acme(), &PromptTemplate::default(), &observer)
            .await;

        assert_eq!(text, "");
        assert_eq!(observer.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_connection_refused_is_soft() {
        let searcher = SerpApiSearcher::new("key").with_endpoint("http://127.0.0.1:1/search");
        let observer = RecordingObserver::default();
        let text = searcher
            .search(&acme(), &PromptTemplate::default(), &observer)
            .await;

        assert_eq!(text, "");
        assert_eq!(observer.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_api_key() {
        let searcher = SerpApiSearcher::new("SECRET-SERP-KEY")
            .with_endpoint("http://127.0.0.1:1/search");
        let observer = RecordingObserver::default();
        searcher
            .search(&acme(), &PromptTemplate::default(), &observer)
            .await;

        let errors = observer.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error during web search: HTTP request to SerpAPI failed"));
        assert!(!errors[0].contains("SECRET-SERP-KEY"), "leaked key: {}", errors[0]);
        assert!(!errors[0].contains("api_key"));
    }

    #[tokio::test]
    async fn test_malformed_snippet_keeps_valid_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic_results": [{"snippet": null}, {"snippet": ["x"]}, {"snippet": "Jane Doe"}]
            })))
            .mount(&server)
            .await;

        let searcher = SerpApiSearcher::new("key").with_endpoint(server.uri());
        let observer = RecordingObserver::default();
        let text = searcher
            .search(&acme(), &PromptTemplate::default(), &observer)
            .await;

        assert_eq!(text, "\n\nJane Doe");
        assert!(observer.errors.lock().unwrap().is_empty());
    }
}
