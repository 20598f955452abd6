//! Shared fixtures for the cross-crate integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use breakout_core::{EntityName, Extractor, Progress, PromptTemplate, RunObserver, SearchProvider};

/// Observer that keeps everything it is told.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<Progress>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn fractions(&self) -> Vec<f64> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .map(Progress::fraction)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunObserver for RecordingObserver {
    async fn progress(&self, progress: Progress) {
        self.progress.lock().unwrap().push(progress);
    }

    async fn error(&self, message: String) {
        self.errors.lock().unwrap().push(message);
    }
}

/// What a scripted search does for one entity.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Text(String),
    /// Reports a transport error and returns nothing, like a real adapter.
    Fail(String),
}

/// Search provider answering from a fixed script; unscripted entities find
/// nothing.
#[derive(Default)]
pub struct ScriptedSearch {
    script: HashMap<String, SearchOutcome>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, entity: &str, text: &str) -> Self {
        self.script
            .insert(entity.to_string(), SearchOutcome::Text(text.to_string()));
        self
    }

    pub fn fail(mut self, entity: &str, message: &str) -> Self {
        self.script
            .insert(entity.to_string(), SearchOutcome::Fail(message.to_string()));
        self
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(
        &self,
        entity: &EntityName,
        prompt: &PromptTemplate,
        observer: &dyn RunObserver,
    ) -> String {
        self.queries.lock().unwrap().push(prompt.render(entity));
        match self.script.get(entity.as_str()) {
            Some(SearchOutcome::Text(text)) => text.clone(),
            Some(SearchOutcome::Fail(message)) => {
                observer
                    .error(format!("Error during web search: {message}"))
                    .await;
                String::new()
            }
            None => String::new(),
        }
    }
}

/// Extractor that records every call and answers `answer for <entity>`.
#[derive(Default)]
pub struct CountingExtractor {
    pub calls: Mutex<Vec<(String, String)>>,
}

impl CountingExtractor {
    pub fn called_for(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(entity, _)| entity.clone())
            .collect()
    }
}

#[async_trait]
impl Extractor for CountingExtractor {
    fn name(&self) -> &str {
        "counting"
    }

    async fn extract(
        &self,
        entity: &EntityName,
        _prompt: &PromptTemplate,
        search_text: &str,
        _observer: &dyn RunObserver,
    ) -> String {
        self.calls
            .lock()
            .unwrap()
            .push((entity.to_string(), search_text.to_string()));
        format!("answer for {entity}")
    }
}

pub fn entities(names: &[&str]) -> Vec<EntityName> {
    names
        .iter()
        .map(|name| EntityName::new(*name).expect("fixture entity names are non-blank"))
        .collect()
}
