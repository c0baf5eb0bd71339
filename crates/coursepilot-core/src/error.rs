//! CoursePilot error taxonomy.
//!
//! Every layer reports through [`CoursePilotError`]; the taxonomy mirrors
//! the pipeline boundaries. Ingestion errors are per-document and never
//! halt a batch; tool and index failures are converted to tool-result
//! strings at the tool boundary; generation failures always propagate to
//! the caller.

use thiserror::Error;

/// Convenience result alias used across all CoursePilot crates.
pub type Result<T> = std::result::Result<T, CoursePilotError>;

#[derive(Debug, Error)]
pub enum CoursePilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// A document header line is missing or blank. Named field lets batch
    /// ingestion report exactly what was malformed.
    #[error("Document header missing required field: {0}")]
    MissingHeaderField(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
