use async_trait::async_trait;

use crate::entity::{EntityName, PromptTemplate};
use crate::observer::RunObserver;

/// Upper bound on organic results requested per entity.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Web search over a rendered prompt.
///
/// Implementations never fail: transport and decoding problems are reported
/// to the observer and yield an empty string, so a single provider hiccup
/// cannot abort a batch. An empty string also means "nothing found".
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Returns up to [`MAX_SEARCH_RESULTS`] snippets joined by `\n`, in
    /// provider ranking order.
    async fn search(
        &self,
        entity: &EntityName,
        prompt: &PromptTemplate,
        observer: &dyn RunObserver,
    ) -> String;
}
