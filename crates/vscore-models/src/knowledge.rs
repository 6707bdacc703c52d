//! Knowledge-base documents used for retrieval-augmented search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output size of the default embedding model (`text-embedding-3-small`).
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// A document indexed for nearest-neighbour search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Free-form key/value metadata
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
    /// Embedding vector; never serialized back to clients
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl KnowledgeDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<serde_json::Value>,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            metadata: metadata.unwrap_or_else(empty_metadata),
            embedding,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One ranked search result. `score` is cosine similarity (`1 - distance`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub score: f64,
}
