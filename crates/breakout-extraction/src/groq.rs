use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use breakout_core::config::{AppConfig, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use breakout_core::error::{BreakoutError, Result};
use breakout_core::{EntityName, Extractor, PromptTemplate, RunObserver};

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.5;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts specific information from web search results.";

/// Extraction Adapter over Groq's OpenAI-compatible chat completions API.
pub struct GroqExtractor {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

// ── Chat completions request/response types ────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Implementation ─────────────────────────────────────────────────────────

impl GroqExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.groq_api_key.clone())
            .with_base_url(config.llm_base_url.clone())
            .with_model(config.llm_model.clone())
    }

    /// Set a custom base URL (proxies, other OpenAI-compatible hosts).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_messages(entity: &EntityName, prompt: &PromptTemplate, search_text: &str) -> Vec<Message> {
        vec![
            Message {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user",
                content: format!(
                    "Extract information from the following search results based on the prompt: '{}'\n\nSearch Results:\n{}\n\nExtracted Information:",
                    prompt.render(entity),
                    search_text
                ),
            },
        ]
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::debug!(
            model = %self.model,
            prompt_len = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Sending extraction request to chat completions API"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                BreakoutError::Extraction(format!(
                    "Chat completions request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(BreakoutError::Extraction(format!(
                "Chat completions API returned status {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| {
                BreakoutError::Extraction(format!(
                    "Failed to parse chat completions response: {}",
                    e.without_url()
                ))
            })?;

        first_choice_text(chat)
    }
}

/// Trimmed content of the first choice. A choice without content counts as
/// an empty answer rather than an error.
fn first_choice_text(response: ChatResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BreakoutError::Extraction("No choices in completion response".to_string()))?;

    tracing::debug!(finish_reason = ?choice.finish_reason, "Received completion");

    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

#[async_trait]
impl Extractor for GroqExtractor {
    fn name(&self) -> &str {
        "groq"
    }

    #[tracing::instrument(skip_all, fields(entity = %entity), name = "groq_extract")]
    async fn extract(
        &self,
        entity: &EntityName,
        prompt: &PromptTemplate,
        search_text: &str,
        observer: &dyn RunObserver,
    ) -> String {
        if search_text.is_empty() {
            tracing::warn!("Extraction requested without search text, skipping model call");
            return String::new();
        }

        let messages = Self::build_messages(entity, prompt, search_text);
        match self.complete(messages).await {
            Ok(answer) => {
                tracing::info!(answer_len = answer.len(), "Extraction complete");
                answer
            }
            Err(e) => {
                tracing::error!(error = %e, "LLM extraction failed");
                observer.error(format!("Error during LLM extraction: {e}")).await;
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
    use wiremock::matchers::{body_partial_json, header, method, path};
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

    fn completion(content: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ]
        })
    }

    fn acme() -> EntityName {
        EntityName::new("Acme Corp").unwrap()
    }

    #[test]
    fn test_build_messages() {
        let messages = GroqExtractor::build_messages(
            &acme(),
            &PromptTemplate::default(),
            "Jane Doe runs Acme.",
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, "user");
        assert_eq!(
            messages[1].content,
            "Extract information from the following search results based on the prompt: \
             'Who is the ceo of Acme Corp?'\n\nSearch Results:\nJane Doe runs Acme.\n\nExtracted Information:"
        );
    }

    #[test]
    fn test_first_choice_text_trims() {
        let response: ChatResponse =
            serde_json::from_value(completion(json!("  answer text \n"))).unwrap();
        assert_eq!(first_choice_text(response).unwrap(), "answer text");
    }

    #[test]
    fn test_first_choice_text_null_content_is_empty() {
        let response: ChatResponse = serde_json::from_value(completion(json!(null))).unwrap();
        assert_eq!(first_choice_text(response).unwrap(), "");
    }

    #[test]
    fn test_first_choice_text_no_choices_is_error() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(first_choice_text(response).is_err());
    }

    #[tokio::test]
    async fn test_extract_sends_fixed_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer groq-key"))
            .and(body_partial_json(json!({
                "model": "mixtral-8x7b-32768",
                "max_tokens": 150,
                "temperature": 0.5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(" Jane Doe\n"))))
            .expect(1)
            .mount(&server)
            .await;

        let extractor = GroqExtractor::new("groq-key").with_base_url(server.uri());
        let observer = RecordingObserver::default();
        let answer = extractor
            .extract(&acme(), &PromptTemplate::default(), "Jane Doe is CEO.", &observer)
            .await;

        assert_eq!(answer, "Jane Doe");
        assert!(observer.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_http_error_is_soft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
            .mount(&server)
            .await;

        let extractor = GroqExtractor::new("groq-key").with_base_url(format!("{}/", server.uri()));
        let observer = RecordingObserver::default();
        let answer = extractor
            .extract(&acme(), &PromptTemplate::default(), "snippet", &observer)
            .await;

        assert_eq!(answer, "");
        let errors = observer.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error during LLM extraction:"));
        assert!(errors[0].contains("503"));
    }

    #[tokio::test]
    async fn test_transport_error_reports_without_url() {
        let extractor = GroqExtractor::new("groq-key").with_base_url("http://127.0.0.1:1/v1");
        let observer = RecordingObserver::default();
        let answer = extractor
            .extract(&acme(), &PromptTemplate::default(), "snippet", &observer)
            .await;

        assert_eq!(answer, "");
        let errors = observer.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error during LLM extraction: Chat completions request failed"));
        assert!(!errors[0].contains("127.0.0.1:1/v1/chat/completions"));
        assert!(!errors[0].contains("groq-key"));
    }

    #[tokio::test]
    async fn test_extract_skips_call_without_search_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!("x"))))
            .expect(0)
            .mount(&server)
            .await;

        let extractor = GroqExtractor::new("groq-key").with_base_url(server.uri());
        let observer = RecordingObserver::default();
        let answer = extractor
            .extract(&acme(), &PromptTemplate::default(), "", &observer)
            .await;

        assert_eq!(answer, "");
        assert!(observer.errors.lock().unwrap().is_empty());
    }
}
