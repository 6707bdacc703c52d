//! Marketing-performance analysis models.
//!
//! [`AnalysisResult`] is the shape the vision model is instructed to return;
//! [`AnalysisRecord`] is the persisted form linked to a video.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::video::VideoId;

/// Highest score any dimension may carry.
pub const MAX_SCORE: i64 = 100;

/// Score and feedback for one analysed dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub feedback: String,
}

/// Per-dimension breakdown. Dimensions the model omits default to score 0
/// with empty feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    #[serde(default)]
    pub hook: DimensionScore,
    #[serde(default)]
    pub pacing: DimensionScore,
    #[serde(default)]
    pub visuals: DimensionScore,
    #[serde(default)]
    pub cta: DimensionScore,
}

impl AnalysisDetails {
    fn dimensions(&self) -> [(&'static str, &DimensionScore); 4] {
        [
            ("hook", &self.hook),
            ("pacing", &self.pacing),
            ("visuals", &self.visuals),
            ("cta", &self.cta),
        ]
    }
}

/// Model output did not match the expected result shape.
#[derive(Debug, Error)]
pub enum ResultShapeError {
    #[error("completion body is empty")]
    Empty,

    #[error("completion body is not valid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} score {score} is outside 0-100")]
    ScoreOutOfRange { field: String, score: i64 },
}

/// Structured result produced by the vision model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: i64,
    pub summary: String,
    #[serde(default)]
    pub details: AnalysisDetails,
}

impl AnalysisResult {
    /// Parse and validate a raw completion body.
    ///
    /// Tolerates a surrounding markdown code fence; everything else must be a
    /// single JSON object with integer scores in range.
    pub fn from_completion(text: &str) -> Result<Self, ResultShapeError> {
        let text = strip_code_fence(text.trim());
        if text.is_empty() {
            return Err(ResultShapeError::Empty);
        }

        let result: AnalysisResult = serde_json::from_str(text)?;
        result.validate()?;
        Ok(result)
    }

    /// Check every score lies within 0..=100.
    pub fn validate(&self) -> Result<(), ResultShapeError> {
        check_score("overallScore", self.overall_score)?;
        for (name, dimension) in self.details.dimensions() {
            check_score(name, dimension.score)?;
        }
        Ok(())
    }
}

fn check_score(field: &str, score: i64) -> Result<(), ResultShapeError> {
    if (0..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(ResultShapeError::ScoreOutOfRange {
            field: field.to_string(),
            score,
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Persisted analysis, one per video, immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub video_id: VideoId,
    pub overall_score: i64,
    pub summary: String,
    pub details: AnalysisDetails,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Build the record for a successful pipeline run.
    pub fn from_result(video_id: VideoId, result: AnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            video_id,
            overall_score: result.overall_score,
            summary: result.summary,
            details: result.details,
            created_at: Utc::now(),
        }
    }
}
