//! Pipeline error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Why a run failed. One variant per pipeline stage.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Frame extraction failed: {0}")]
    Extraction(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid analysis result: {0}")]
    Parse(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn parse_failed(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn persistence_failed(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Stages whose failures may be transient.
    ///
    /// Extraction and parse failures point at bad input and are never
    /// retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Download(_) | WorkerError::Inference(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::Config(_) => "config",
            WorkerError::Download(_) => "download",
            WorkerError::Extraction(_) => "extraction",
            WorkerError::Inference(_) => "inference",
            WorkerError::Parse(_) => "parse",
            WorkerError::Persistence(_) => "persistence",
            WorkerError::Io(_) => "io",
        }
    }
}

impl From<vscore_db::DbError> for WorkerError {
    fn from(e: vscore_db::DbError) -> Self {
        Self::Persistence(e.to_string())
    }
}
