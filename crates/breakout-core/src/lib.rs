pub mod api_types;
pub mod config;
pub mod entity;
pub mod error;
pub mod extraction;
pub mod observer;
pub mod search;

pub use config::AppConfig;
pub use entity::{EntityName, ExtractionRecord, PromptTemplate, ResultSet, DEFAULT_PROMPT, NO_DATA_FOUND};
pub use error::{BreakoutError, Result};
pub use extraction::Extractor;
pub use observer::{Progress, RunObserver, TracingObserver};
pub use search::{SearchProvider, MAX_SEARCH_RESULTS};
