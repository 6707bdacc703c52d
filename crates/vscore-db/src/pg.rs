//! Postgres backend.
//!
//! Queries are checked at runtime (no compile-time database needed).
//! Embeddings travel as pgvector text literals cast with `::vector`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use vscore_models::{
    AnalysisDetails, AnalysisRecord, KnowledgeDocument, SearchHit, VideoId, VideoRecord,
    VideoStatus, VideoWithAnalysis, DEFAULT_EMBEDDING_DIMENSIONS,
};

use crate::error::{DbError, DbResult};
use crate::store::{KnowledgeStore, VideoStore};

/// Connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Read `DATABASE_URL`; `None` when it is unset or empty.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty())?;
        Some(Self {
            url,
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(5),
        })
    }
}

const VIDEO_COLUMNS: &str =
    "id, filename, original_name, mime_type, size, url, status, created_at, updated_at";

#[derive(Debug, FromRow)]
struct VideoRow {
    id: String,
    filename: String,
    original_name: String,
    mime_type: String,
    size: i64,
    url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VideoRow> for VideoRecord {
    type Error = DbError;

    fn try_from(row: VideoRow) -> DbResult<Self> {
        let status = row
            .status
            .parse::<VideoStatus>()
            .map_err(DbError::InvalidData)?;
        Ok(VideoRecord {
            id: VideoId::from(row.id),
            filename: row.filename,
            original_name: row.original_name,
            mime_type: row.mime_type,
            size: row.size,
            url: row.url,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: String,
    video_id: String,
    overall_score: i32,
    summary: String,
    details: Json<AnalysisDetails>,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        AnalysisRecord {
            id: row.id,
            video_id: VideoId::from(row.video_id),
            overall_score: i64::from(row.overall_score),
            summary: row.summary,
            details: row.details.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SearchRow {
    id: String,
    title: String,
    content: String,
    metadata: Json<serde_json::Value>,
    score: f64,
}

/// Postgres-backed [`VideoStore`] and [`KnowledgeStore`].
///
/// Embedding width is fixed by the `vector(1536)` column in the initial
/// migration; changing it needs a new migration.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(
            max_connections = config.max_connections,
            "Connected to Postgres and applied migrations"
        );

        Ok(Self { pool })
    }

    fn check_dimensions(&self, embedding: &[f32]) -> DbResult<()> {
        if embedding.len() != DEFAULT_EMBEDDING_DIMENSIONS {
            return Err(DbError::DimensionMismatch {
                expected: DEFAULT_EMBEDDING_DIMENSIONS,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Explain why a conditional update matched no row.
    async fn status_conflict(&self, id: &VideoId, expected: VideoStatus) -> DbError {
        let row: Result<Option<(String, Option<String>)>, sqlx::Error> =
            sqlx::query_as("SELECT status, url FROM videos WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(None) => DbError::not_found(id.as_str()),
            Ok(Some((status, url))) => match status.parse::<VideoStatus>() {
                Ok(status) if status == expected && url.is_none() => {
                    DbError::MissingUrl(id.to_string())
                }
                Ok(status) => DbError::StatusConflict {
                    id: id.to_string(),
                    status,
                    expected,
                },
                Err(e) => DbError::InvalidData(e),
            },
            Err(e) => DbError::Sqlx(e),
        }
    }
}

/// Render an embedding as a pgvector literal: `[0.1,0.2,...]`.
pub(crate) fn vector_literal(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len() * 10 + 2);
    out.push('[');
    for (i, v) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
    out
}

#[async_trait]
impl VideoStore for PgStore {
    async fn create_video(&self, video: &VideoRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO videos (id, filename, original_name, mime_type, size, url, status,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(video.id.as_str())
        .bind(&video.filename)
        .bind(&video.original_name)
        .bind(&video.mime_type)
        .bind(video.size)
        .bind(video.url.as_deref())
        .bind(video.status.as_str())
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_video(&self, id: &VideoId) -> DbResult<Option<VideoRecord>> {
        let row: Option<VideoRow> =
            sqlx::query_as(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        row.map(VideoRecord::try_from).transpose()
    }

    async fn get_video_with_analysis(&self, id: &VideoId) -> DbResult<Option<VideoWithAnalysis>> {
        let Some(video) = self.get_video(id).await? else {
            return Ok(None);
        };

        let analysis: Option<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT id, video_id, overall_score, summary, details, created_at
            FROM analyses WHERE video_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(VideoWithAnalysis {
            video,
            analysis: analysis.map(AnalysisRecord::from),
        }))
    }

    async fn mark_processing(&self, id: &VideoId) -> DbResult<VideoRecord> {
        let row: Option<VideoRow> = sqlx::query_as(&format!(
            r#"
            UPDATE videos SET status = 'PROCESSING', updated_at = now()
            WHERE id = $1 AND status = 'PENDING' AND url IS NOT NULL
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.status_conflict(id, VideoStatus::Pending).await),
        }
    }

    async fn complete_with_analysis(&self, analysis: &AnalysisRecord) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE videos SET status = 'COMPLETED', updated_at = now()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(analysis.video_id.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self
                .status_conflict(&analysis.video_id, VideoStatus::Processing)
                .await);
        }

        let score = i32::try_from(analysis.overall_score)
            .map_err(|_| DbError::InvalidData(format!("score {}", analysis.overall_score)))?;

        sqlx::query(
            r#"
            INSERT INTO analyses (id, video_id, overall_score, summary, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&analysis.id)
        .bind(analysis.video_id.as_str())
        .bind(score)
        .bind(&analysis.summary)
        .bind(Json(&analysis.details))
        .bind(analysis.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn heartbeat(&self, id: &VideoId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE videos SET updated_at = now() WHERE id = $1 AND status = 'PROCESSING'",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, id: &VideoId) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE videos SET status = 'FAILED', updated_at = now()
            WHERE id = $1 AND status = 'PROCESSING'
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_stale_processing(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<VideoId>> {
        let ids: Vec<(String,)> = sqlx::query_as(
            r#"
            UPDATE videos SET status = 'FAILED', updated_at = now()
            WHERE status = 'PROCESSING' AND updated_at < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        if !ids.is_empty() {
            warn!(count = ids.len(), "Failed stale PROCESSING videos");
        }
        Ok(ids.into_iter().map(|(id,)| VideoId::from(id)).collect())
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for PgStore {
    async fn upsert_document(&self, doc: &KnowledgeDocument) -> DbResult<()> {
        self.check_dimensions(&doc.embedding)?;

        sqlx::query(
            r#"
            INSERT INTO knowledge_base (id, title, content, metadata, embedding, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5::vector, $6, $6)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                metadata = EXCLUDED.metadata,
                embedding = EXCLUDED.embedding,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(Json(&doc.metadata))
        .bind(vector_literal(&doc.embedding))
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn search(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<SearchHit>> {
        self.check_dimensions(embedding)?;

        let rows: Vec<SearchRow> = sqlx::query_as(
            r#"
            SELECT id, title, content, metadata,
                   (1 - (embedding <=> $1::vector))::float8 AS score
            FROM knowledge_base
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1::vector
            LIMIT $2
            "#,
        )
        .bind(vector_literal(embedding))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchHit {
                id: row.id,
                title: row.title,
                content: row.content,
                metadata: row.metadata.0,
                score: row.score,
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        DEFAULT_EMBEDDING_DIMENSIONS
    }
}
