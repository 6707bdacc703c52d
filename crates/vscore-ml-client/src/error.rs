//! Error types for model backend calls.

use thiserror::Error;

/// Result type for model backend calls.
pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    /// Endpoint or credential missing. Raised before any network call.
    #[error("Model backend not configured: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Completion has no content")]
    EmptyCompletion,
}

impl MlError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            MlError::Request(_) | MlError::Timeout => true,
            MlError::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MlError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MlError::Timeout
        } else if e.is_decode() {
            MlError::InvalidResponse(e.to_string())
        } else {
            MlError::Request(e.to_string())
        }
    }
}

/// Longest error body kept in [`MlError::Status`].
pub(crate) const MAX_ERROR_BODY: usize = 1024;

pub(crate) async fn status_error(response: reqwest::Response) -> MlError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    MlError::Status { status, body }
}
