//! Text embedding client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{status_error, MlError, MlResult};

/// Maps text to a fixed-width vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, input: &str) -> MlResult<Vec<f32>>;

    /// Width of every returned vector.
    fn dimensions(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Azure OpenAI embeddings client.
#[derive(Clone)]
pub struct AzureEmbeddingClient {
    client: Client,
    url: String,
    api_key: String,
    dimensions: usize,
}

impl AzureEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> MlResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MlError::config_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.embeddings_url(),
            client,
            api_key: config.api_key,
            dimensions: config.dimensions,
        })
    }

    pub fn from_env() -> MlResult<Self> {
        Self::new(EmbeddingConfig::from_env()?)
    }
}

#[async_trait]
impl Embedder for AzureEmbeddingClient {
    async fn embed(&self, input: &str) -> MlResult<Vec<f32>> {
        debug!(chars = input.len(), "Requesting embedding");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingRequest { input: [input] })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MlError::invalid_response(format!("failed to parse embeddings: {e}")))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MlError::invalid_response("embedding response has no data"))?;

        if embedding.len() != self.dimensions {
            return Err(MlError::invalid_response(format!(
                "embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
