//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or processing media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Download failed with HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("No frames were extracted into {0}")]
    NoFrames(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Client errors (4xx other than 408/429) are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            MediaError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            MediaError::DownloadFailed { .. } | MediaError::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let err = |status| MediaError::HttpStatus {
            status,
            reason: String::new(),
        };
        assert!(!err(404).is_retryable());
        assert!(!err(403).is_retryable());
        assert!(err(429).is_retryable());
        assert!(err(503).is_retryable());
        assert!(MediaError::download_failed("connection reset").is_retryable());
        assert!(!MediaError::NoFrames(PathBuf::from("/tmp/x")).is_retryable());
    }

    #[test]
    fn test_status_in_message() {
        let err = MediaError::HttpStatus {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "Download failed with HTTP 404: Not Found");
    }
}
