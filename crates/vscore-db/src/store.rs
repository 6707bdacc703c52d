//! Storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vscore_models::{
    AnalysisRecord, KnowledgeDocument, SearchHit, VideoId, VideoRecord, VideoWithAnalysis,
};

use crate::error::DbResult;

/// Video and analysis persistence.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Insert a new PENDING video, blob URL included.
    async fn create_video(&self, video: &VideoRecord) -> DbResult<()>;

    async fn get_video(&self, id: &VideoId) -> DbResult<Option<VideoRecord>>;

    async fn get_video_with_analysis(&self, id: &VideoId) -> DbResult<Option<VideoWithAnalysis>>;

    /// PENDING -> PROCESSING. Requires a blob URL.
    ///
    /// Exactly one concurrent caller wins; the rest get a conflict.
    async fn mark_processing(&self, id: &VideoId) -> DbResult<VideoRecord>;

    /// Insert the analysis and move PROCESSING -> COMPLETED in one
    /// transaction. Nothing is written if the video is not PROCESSING.
    async fn complete_with_analysis(&self, analysis: &AnalysisRecord) -> DbResult<()>;

    /// Refresh `updated_at` of a PROCESSING video so the sweeper leaves it
    /// alone. Returns false when the video is no longer PROCESSING.
    async fn heartbeat(&self, id: &VideoId) -> DbResult<bool>;

    /// PROCESSING -> FAILED. Returns false when the video was not PROCESSING.
    async fn mark_failed(&self, id: &VideoId) -> DbResult<bool>;

    /// Fail every PROCESSING video last updated (or heartbeated) before
    /// `cutoff`.
    async fn fail_stale_processing(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<VideoId>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> DbResult<()>;
}

/// Knowledge-base persistence with nearest-neighbour search.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Insert or replace a document by id.
    async fn upsert_document(&self, doc: &KnowledgeDocument) -> DbResult<()>;

    /// Documents closest to `embedding` by cosine distance, best first.
    async fn search(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<SearchHit>>;

    /// Embedding width the store accepts.
    fn dimensions(&self) -> usize;
}

/// Cosine similarity in `[-1, 1]`; 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}
