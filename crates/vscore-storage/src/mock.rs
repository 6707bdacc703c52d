//! Local signer used when no object store is configured.

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageResult;
use crate::{validate_blob_name, UploadTarget, UploadUrlSigner};

/// Issues unsigned URLs under a local base, for development and tests.
#[derive(Debug, Clone)]
pub struct MockUploadSigner {
    base_url: String,
}

impl MockUploadSigner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base from `MOCK_STORAGE_BASE_URL`, default `http://localhost:3000`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("MOCK_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        )
    }
}

#[async_trait]
impl UploadUrlSigner for MockUploadSigner {
    async fn issue(&self, blob_name: &str, _content_type: &str) -> StorageResult<UploadTarget> {
        validate_blob_name(blob_name)?;
        let encoded = urlencoding::encode(blob_name);
        debug!(blob = blob_name, "Issued mock upload URL");

        Ok(UploadTarget {
            upload_url: format!("{}/mock-upload/{}", self.base_url, encoded),
            blob_url: format!("{}/mock-blob/{}", self.base_url, encoded),
        })
    }
}
