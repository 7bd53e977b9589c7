use thiserror::Error;

/// Top-level error type for the report pipelines.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("row source unavailable ({database}): {message}")]
    SourceUnavailable { database: String, message: String },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("name not found: {0}")]
    NameNotFound(String),

    #[error("failed to write quota counter {counter_id}: {message}")]
    CounterWriteFailed { counter_id: i64, message: String },

    #[error("mail delivery failed: {0}")]
    MailError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
