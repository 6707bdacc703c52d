//! Knowledge-base search and indexing.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use validator::{Validate, ValidationError};

use vscore_db::DbError;
use vscore_ml_client::Embedder;
use vscore_models::{KnowledgeDocument, SearchHit};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(custom(function = "not_blank"))]
    pub query: String,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub data: SearchData,
}

#[derive(Debug, Serialize)]
pub struct SearchData {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Rank knowledge-base documents against a natural-language query.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    request.validate()?;
    let embedder = require_embedder(&state)?;

    let limit = request
        .limit
        .map(|l| l as usize)
        .unwrap_or(DEFAULT_SEARCH_LIMIT);
    let embedding = embedder.embed(&request.query).await?;
    let results = state.knowledge.search(&embedding, limit).await?;

    debug!(limit, results = results.len(), "Knowledge search served");
    metrics::record_rag_query(results.len());

    Ok(Json(SearchResponse {
        success: true,
        data: SearchData {
            query: request.query,
            results,
        },
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct IndexRequest {
    #[validate(length(min = 1, max = 255))]
    pub id: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub success: bool,
}

/// Embed a document and insert or replace it by id.
pub async fn index_document(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> ApiResult<Json<IndexResponse>> {
    request.validate()?;
    let embedder = require_embedder(&state)?;

    let embedding = embedder.embed(&request.content).await?;
    let expected = state.knowledge.dimensions();
    if embedding.len() != expected {
        return Err(DbError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        }
        .into());
    }

    let document = KnowledgeDocument::new(
        request.id,
        request.title,
        request.content,
        request.metadata.map(Value::Object),
        embedding,
    );
    state.knowledge.upsert_document(&document).await?;

    info!(document_id = %document.id, "Knowledge document indexed");
    metrics::record_document_indexed();

    Ok(Json(IndexResponse { success: true }))
}

fn require_embedder(state: &AppState) -> ApiResult<Arc<dyn Embedder>> {
    state
        .embedder
        .clone()
        .ok_or_else(|| ApiError::internal("embedding model is not configured"))
}
