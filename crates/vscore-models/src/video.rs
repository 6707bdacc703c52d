//! Video record models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::AnalysisRecord;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a video.
///
/// Transitions only move forward: `Pending -> Processing -> {Completed, Failed}`.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    /// Upload URL issued, bytes not yet confirmed
    #[default]
    Pending,
    /// Upload confirmed, analysis pipeline running
    Processing,
    /// Analysis stored
    Completed,
    /// Pipeline failed
    Failed,
}

/// Rejected status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: VideoStatus,
    pub to: VideoStatus,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "PENDING",
            VideoStatus::Processing => "PROCESSING",
            VideoStatus::Completed => "COMPLETED",
            VideoStatus::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }

    /// The single status a transition to `self` must start from.
    pub fn required_predecessor(&self) -> Option<VideoStatus> {
        match self {
            VideoStatus::Pending => None,
            VideoStatus::Processing => Some(VideoStatus::Pending),
            VideoStatus::Completed | VideoStatus::Failed => Some(VideoStatus::Processing),
        }
    }

    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        next.required_predecessor() == Some(*self)
    }

    /// Validate a transition and return the new status.
    pub fn transition(self, next: VideoStatus) -> Result<VideoStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VideoStatus::Pending),
            "PROCESSING" => Ok(VideoStatus::Processing),
            "COMPLETED" => Ok(VideoStatus::Completed),
            "FAILED" => Ok(VideoStatus::Failed),
            other => Err(format!("unknown video status: {other}")),
        }
    }
}

/// Video record as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: VideoId,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    /// Size in bytes as reported by the client
    pub size: i64,
    /// Blob URL, written once the upload URL has been issued
    pub url: Option<String>,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new PENDING record for an upload that is about to start.
    pub fn new_pending(filename: impl Into<String>, mime_type: impl Into<String>, size: i64) -> Self {
        let filename = filename.into();
        let now = Utc::now();

        Self {
            id: VideoId::new(),
            original_name: filename.clone(),
            filename,
            mime_type: mime_type.into(),
            size,
            url: None,
            status: VideoStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Blob name used in storage: `{id}-{filename}`.
    pub fn blob_name(&self) -> String {
        format!("{}-{}", self.id, crate::utils::sanitize_filename(&self.filename))
    }
}

/// A video record with its analysis, if one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoWithAnalysis {
    #[serde(flatten)]
    pub video: VideoRecord,
    pub analysis: Option<AnalysisRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_generation() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_forward_transitions() {
        assert_eq!(
            VideoStatus::Pending.transition(VideoStatus::Processing),
            Ok(VideoStatus::Processing)
        );
        assert!(VideoStatus::Processing.can_transition_to(VideoStatus::Completed));
        assert!(VideoStatus::Processing.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [VideoStatus::Completed, VideoStatus::Failed] {
            assert!(terminal.is_terminal());
            for next in [
                VideoStatus::Pending,
                VideoStatus::Processing,
                VideoStatus::Completed,
                VideoStatus::Failed,
            ] {
                assert!(terminal.transition(next).is_err());
            }
        }
    }

    #[test]
    fn test_no_skipping_processing() {
        let err = VideoStatus::Pending
            .transition(VideoStatus::Completed)
            .unwrap_err();
        assert_eq!(err.from, VideoStatus::Pending);
        assert_eq!(err.to, VideoStatus::Completed);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            VideoStatus::Pending,
            VideoStatus::Processing,
            VideoStatus::Completed,
            VideoStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<VideoStatus>(), Ok(status));
        }
        assert!("DONE".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = VideoRecord::new_pending("clip.mp4", "video/mp4", 1024);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["originalName"], "clip.mp4");
        assert_eq!(json["mimeType"], "video/mp4");
        assert_eq!(json["status"], "PENDING");
        assert!(json["url"].is_null());
    }

    #[test]
    fn test_blob_name_prefixes_id() {
        let record = VideoRecord::new_pending("my clip.mp4", "video/mp4", 10);
        assert_eq!(record.blob_name(), format!("{}-my clip.mp4", record.id));
    }

    #[test]
    fn test_video_with_analysis_flattens() {
        let record = VideoRecord::new_pending("a.mp4", "video/mp4", 1);
        let wrapped = VideoWithAnalysis {
            video: record.clone(),
            analysis: None,
        };
        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["id"], record.id.as_str());
        assert!(json["analysis"].is_null());
    }
}
