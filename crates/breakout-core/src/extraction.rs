use async_trait::async_trait;

use crate::entity::{EntityName, PromptTemplate};
use crate::observer::RunObserver;

/// Language-model extraction of an answer from search text.
///
/// Like [`crate::SearchProvider`], failures are reported to the observer and
/// produce an empty string. Callers must only invoke `extract` with
/// non-empty `search_text`.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(
        &self,
        entity: &EntityName,
        prompt: &PromptTemplate,
        search_text: &str,
        observer: &dyn RunObserver,
    ) -> String;
}
