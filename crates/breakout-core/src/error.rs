use thiserror::Error;

#[derive(Error, Debug)]
pub enum BreakoutError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Adapter messages already name the provider and get their own
    /// "Error during ..." prefix when reported, so no extra label here.
    #[error("{0}")]
    Search(String),

    #[error("{0}")]
    Extraction(String),

    #[error("Invalid prompt template: {0}")]
    Template(String),

    #[error("Invalid entity: {0}")]
    Entity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BreakoutError>;
