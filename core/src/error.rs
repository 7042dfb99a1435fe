use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngagementError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Schema mismatch: expected column '{expected}' at position {position}, found '{found}'")]
    SchemaMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngagementResult<T> = Result<T, EngagementError>;
