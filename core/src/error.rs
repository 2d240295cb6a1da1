use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("title not found: {0}")]
    NotFound(String),

    #[error("degenerate model: {0}")]
    DegenerateModel(String),

    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Query-time failures that a serving loop reports back instead of treating as fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::InvalidQuery(_))
    }
}
