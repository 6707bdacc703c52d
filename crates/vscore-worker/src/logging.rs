//! Structured per-run logging.

use tracing::{error, info, warn, Span};
use vscore_models::VideoId;

/// Logs pipeline lifecycle events with the video id and step attached.
#[derive(Debug, Clone)]
pub struct RunLogger {
    video_id: String,
}

impl RunLogger {
    pub fn new(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(video_id = %self.video_id, "Analysis started: {}", message);
    }

    pub fn log_step(&self, step: &str, duration_ms: u128) {
        info!(
            video_id = %self.video_id,
            step,
            duration_ms = duration_ms as u64,
            "Step finished"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(video_id = %self.video_id, "Analysis warning: {}", message);
    }

    pub fn log_error(&self, kind: &str, message: &str) {
        error!(
            video_id = %self.video_id,
            error_kind = kind,
            "Analysis failed: {}", message
        );
    }

    pub fn log_completion(&self, overall_score: i64, duration_ms: u128) {
        info!(
            video_id = %self.video_id,
            overall_score,
            duration_ms = duration_ms as u64,
            "Analysis completed"
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Span covering a whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("analysis_run", video_id = %self.video_id)
    }
}
