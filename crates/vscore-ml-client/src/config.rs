//! Model backend configuration.

use std::time::Duration;

use crate::error::{MlError, MlResult};

const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Chat-completions deployment used for frame analysis.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl VisionConfig {
    /// Load from environment. Missing endpoint or key is a configuration error.
    pub fn from_env() -> MlResult<Self> {
        Ok(Self {
            endpoint: required_env("AZURE_OPENAI_ENDPOINT")?,
            api_key: required_env("AZURE_OPENAI_API_KEY")?,
            deployment: std::env::var("AZURE_OPENAI_DEPLOYMENT_ID")
                .unwrap_or_else(|_| "gpt-5.1-codex-mini".to_string()),
            api_version: std::env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(
                std::env::var("AZURE_OPENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        })
    }

    pub(crate) fn validate(&self) -> MlResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(MlError::config_error("AZURE_OPENAI_ENDPOINT is empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(MlError::config_error("AZURE_OPENAI_API_KEY is empty"));
        }
        Ok(())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

/// Embedding deployment used for knowledge-base search.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    /// Expected vector width
    pub dimensions: usize,
    pub timeout: Duration,
}

impl EmbeddingConfig {
    pub fn from_env() -> MlResult<Self> {
        Ok(Self {
            endpoint: required_env("AZURE_OPENAI_ENDPOINT")?,
            api_key: required_env("AZURE_OPENAI_API_KEY")?,
            deployment: std::env::var("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            api_version: std::env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            // fixed by the `vector(1536)` knowledge_base column
            dimensions: 1536,
            timeout: Duration::from_secs(30),
        })
    }

    pub(crate) fn validate(&self) -> MlResult<()> {
        if self.endpoint.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(MlError::config_error(
                "embedding endpoint and API key are required",
            ));
        }
        Ok(())
    }

    pub(crate) fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

fn required_env(key: &str) -> MlResult<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| MlError::config_error(format!("{key} not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        let config = VisionConfig {
            endpoint: "https://res.openai.azure.com/".into(),
            api_key: "k".into(),
            deployment: "gpt-5.1-codex-mini".into(),
            api_version: DEFAULT_API_VERSION.into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            config.completions_url(),
            "https://res.openai.azure.com/openai/deployments/gpt-5.1-codex-mini/chat/completions?api-version=2024-05-01-preview"
        );
    }

    #[test]
    fn test_validate_rejects_blank_credentials() {
        let config = VisionConfig {
            endpoint: "https://res.openai.azure.com".into(),
            api_key: "  ".into(),
            deployment: "d".into(),
            api_version: DEFAULT_API_VERSION.into(),
            timeout: Duration::from_secs(1),
        };
        assert!(matches!(config.validate(), Err(MlError::Config(_))));
    }
}
