use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use breakout_core::{
    AppConfig, EntityName, ExtractionRecord, Extractor, Progress, PromptTemplate, ResultSet,
    RunObserver, SearchProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Delay between entities in sequential mode; minimum spacing between
    /// unit starts in concurrent mode.
    pub pacing: Duration,
    /// 1 runs the plain sequential loop.
    pub max_concurrency: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            pacing: config.pacing(),
            max_concurrency: config.max_concurrency.max(1),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(500),
            max_concurrency: 1,
        }
    }
}

/// Drives search then extraction for every entity of a run.
///
/// Adapters absorb their own failures, so a run always yields exactly one
/// record per input entity, in input order.
pub struct Orchestrator {
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn Extractor>,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn Extractor>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            search,
            extractor,
            options,
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn search_provider(&self) -> &dyn SearchProvider {
        self.search.as_ref()
    }

    pub fn extractor(&self) -> &dyn Extractor {
        self.extractor.as_ref()
    }

    #[instrument(skip_all, fields(entities = entities.len(), concurrency = self.options.max_concurrency))]
    pub async fn process_entities(
        &self,
        entities: &[EntityName],
        prompt: &PromptTemplate,
        observer: Arc<dyn RunObserver>,
    ) -> ResultSet {
        info!(prompt = %prompt.as_str(), "Starting entity processing run");

        let results = if self.options.max_concurrency <= 1 {
            self.process_sequential(entities, prompt, observer.as_ref()).await
        } else {
            self.process_concurrent(entities, prompt, observer).await
        };

        let no_data = results.iter().filter(|r| r.is_no_data()).count();
        info!(
            records = results.len(),
            no_data,
            "Entity processing run complete"
        );

        results
    }

    async fn process_sequential(
        &self,
        entities: &[EntityName],
        prompt: &PromptTemplate,
        observer: &dyn RunObserver,
    ) -> ResultSet {
        let total = entities.len();
        let mut records = Vec::with_capacity(total);

        for (i, entity) in entities.iter().enumerate() {
            observer.progress(Progress::new(i + 1, total)).await;

            let record = process_entity(
                self.search.as_ref(),
                self.extractor.as_ref(),
                entity,
                prompt,
                observer,
            )
            .await;
            records.push(record);

            if i + 1 < total && !self.options.pacing.is_zero() {
                tokio::time::sleep(self.options.pacing).await;
            }
        }

        records.into()
    }

    /// Runs each entity as its own task, at most `max_concurrency` at once,
    /// with unit starts spaced by a shared token bucket. Records land in a
    /// buffer addressed by input index, so completion order does not matter.
    /// Progress counts completed units.
    async fn process_concurrent(
        &self,
        entities: &[EntityName],
        prompt: &PromptTemplate,
        observer: Arc<dyn RunObserver>,
    ) -> ResultSet {
        let total = entities.len();
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));
        let limiter: Option<Arc<DefaultDirectRateLimiter>> =
            Quota::with_period(self.options.pacing).map(|quota| Arc::new(RateLimiter::direct(quota)));
        let prompt = Arc::new(prompt.clone());
        let completed = Arc::new(AtomicUsize::new(0));

        let mut join_set = JoinSet::new();
        for (i, entity) in entities.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let limiter = limiter.clone();
            let search = self.search.clone();
            let extractor = self.extractor.clone();
            let prompt = prompt.clone();
            let observer = observer.clone();
            let completed = completed.clone();

            join_set.spawn(async move {
                // The semaphore is never closed, so acquisition only fails on shutdown.
                let _permit = semaphore.acquire_owned().await.ok();
                if let Some(limiter) = &limiter {
                    limiter.until_ready().await;
                }

                let record = process_entity(
                    search.as_ref(),
                    extractor.as_ref(),
                    &entity,
                    &prompt,
                    observer.as_ref(),
                )
                .await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                observer.progress(Progress::new(done, total)).await;
                (i, record)
            });
        }

        let mut slots: Vec<Option<ExtractionRecord>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((i, record)) => slots[i] = Some(record),
                Err(join_err) => {
                    error!(error = %join_err, "Entity task panicked");
                    observer
                        .error(format!("Entity processing task failed: {join_err}"))
                        .await;
                }
            }
        }

        slots
            .into_iter()
            .zip(entities)
            .map(|(slot, entity)| {
                slot.unwrap_or_else(|| ExtractionRecord::new(entity.clone(), String::new()))
            })
            .collect()
    }
}

/// search → (extract | sentinel) → record, for one entity.
async fn process_entity(
    search: &dyn SearchProvider,
    extractor: &dyn Extractor,
    entity: &EntityName,
    prompt: &PromptTemplate,
    observer: &dyn RunObserver,
) -> ExtractionRecord {
    let search_text = search.search(entity, prompt, observer).await;

    if search_text.is_empty() {
        debug!(entity = %entity, "No search text, recording sentinel");
        return ExtractionRecord::no_data(entity.clone());
    }

    let extracted = extractor
        .extract(entity, prompt, &search_text, observer)
        .await;
    ExtractionRecord::new(entity.clone(), extracted)
}
