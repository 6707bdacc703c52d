//! In-process backend.
//!
//! All state sits behind one lock so the conditional updates and the
//! completion "transaction" are atomic, matching the Postgres semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use vscore_models::{
    AnalysisRecord, KnowledgeDocument, SearchHit, VideoId, VideoRecord, VideoStatus,
    VideoWithAnalysis, DEFAULT_EMBEDDING_DIMENSIONS,
};

use crate::error::{DbError, DbResult};
use crate::store::{cosine_similarity, KnowledgeStore, VideoStore};

#[derive(Default)]
struct Inner {
    videos: HashMap<VideoId, VideoRecord>,
    analyses: HashMap<VideoId, AnalysisRecord>,
    documents: HashMap<String, KnowledgeDocument>,
}

impl Inner {
    /// Move `id` to `next` if its current status is the required predecessor.
    fn transition(&mut self, id: &VideoId, next: VideoStatus) -> DbResult<&mut VideoRecord> {
        let video = self
            .videos
            .get_mut(id)
            .ok_or_else(|| DbError::not_found(id.as_str()))?;

        let expected = next.required_predecessor().unwrap_or(VideoStatus::Pending);
        video.status = video
            .status
            .transition(next)
            .map_err(|e| DbError::StatusConflict {
                id: id.to_string(),
                status: e.from,
                expected,
            })?;
        video.updated_at = Utc::now();
        Ok(video)
    }
}

/// [`VideoStore`] and [`KnowledgeStore`] held in memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    dimensions: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_EMBEDDING_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            dimensions,
        }
    }

    /// Overwrite a video's `updated_at`, for exercising staleness logic.
    pub async fn backdate(&self, id: &VideoId, updated_at: DateTime<Utc>) -> DbResult<()> {
        let mut inner = self.inner.lock().await;
        let video = inner
            .videos
            .get_mut(id)
            .ok_or_else(|| DbError::not_found(id.as_str()))?;
        video.updated_at = updated_at;
        Ok(())
    }

    /// Number of stored videos.
    pub async fn video_count(&self) -> usize {
        self.inner.lock().await.videos.len()
    }

    /// Number of stored analyses.
    pub async fn analysis_count(&self) -> usize {
        self.inner.lock().await.analyses.len()
    }

    fn check_dimensions(&self, embedding: &[f32]) -> DbResult<()> {
        if embedding.len() != self.dimensions {
            return Err(DbError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn create_video(&self, video: &VideoRecord) -> DbResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.videos.contains_key(&video.id) {
            return Err(DbError::StatusConflict {
                id: video.id.to_string(),
                status: video.status,
                expected: VideoStatus::Pending,
            });
        }
        inner.videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn get_video(&self, id: &VideoId) -> DbResult<Option<VideoRecord>> {
        Ok(self.inner.lock().await.videos.get(id).cloned())
    }

    async fn get_video_with_analysis(&self, id: &VideoId) -> DbResult<Option<VideoWithAnalysis>> {
        let inner = self.inner.lock().await;
        Ok(inner.videos.get(id).map(|video| VideoWithAnalysis {
            video: video.clone(),
            analysis: inner.analyses.get(id).cloned(),
        }))
    }

    async fn mark_processing(&self, id: &VideoId) -> DbResult<VideoRecord> {
        let mut inner = self.inner.lock().await;
        match inner.videos.get(id) {
            None => return Err(DbError::not_found(id.as_str())),
            Some(v) if v.status == VideoStatus::Pending && v.url.is_none() => {
                return Err(DbError::MissingUrl(id.to_string()));
            }
            Some(_) => {}
        }
        let video = inner.transition(id, VideoStatus::Processing)?;
        Ok(video.clone())
    }

    async fn complete_with_analysis(&self, analysis: &AnalysisRecord) -> DbResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.analyses.contains_key(&analysis.video_id) {
            return Err(DbError::InvalidData(format!(
                "analysis already exists for {}",
                analysis.video_id
            )));
        }
        inner.transition(&analysis.video_id, VideoStatus::Completed)?;
        inner
            .analyses
            .insert(analysis.video_id.clone(), analysis.clone());
        Ok(())
    }

    async fn heartbeat(&self, id: &VideoId) -> DbResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.videos.get_mut(id) {
            Some(video) if video.status == VideoStatus::Processing => {
                video.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: &VideoId) -> DbResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.transition(id, VideoStatus::Failed) {
            Ok(_) => Ok(true),
            Err(DbError::StatusConflict { .. }) | Err(DbError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn fail_stale_processing(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<VideoId>> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let mut failed = Vec::new();
        for video in inner.videos.values_mut() {
            if video.status == VideoStatus::Processing && video.updated_at < cutoff {
                video.status = VideoStatus::Failed;
                video.updated_at = now;
                failed.push(video.id.clone());
            }
        }
        Ok(failed)
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn upsert_document(&self, doc: &KnowledgeDocument) -> DbResult<()> {
        self.check_dimensions(&doc.embedding)?;
        let mut inner = self.inner.lock().await;
        let created_at = inner
            .documents
            .get(&doc.id)
            .map(|existing| existing.created_at)
            .unwrap_or(doc.created_at);
        let mut stored = doc.clone();
        stored.created_at = created_at;
        inner.documents.insert(doc.id.clone(), stored);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<SearchHit>> {
        self.check_dimensions(embedding)?;
        let inner = self.inner.lock().await;

        let mut hits: Vec<SearchHit> = inner
            .documents
            .values()
            .map(|doc| SearchHit {
                id: doc.id.clone(),
                title: doc.title.clone(),
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                score: cosine_similarity(embedding, &doc.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
