//! S3-compatible (Cloudflare R2, AWS S3, MinIO) upload URL signer.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::{validate_blob_name, UploadTarget, UploadUrlSigner};

/// Configuration for the object store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public read base for blob URLs; defaults to `{endpoint}/{bucket}`
    pub public_base_url: Option<String>,
    /// Lifetime of signed upload URLs
    pub upload_url_ttl: Duration,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "vidscoreai".to_string()),
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("STORAGE_PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            upload_url_ttl: Duration::from_secs(
                std::env::var("STORAGE_UPLOAD_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        })
    }

    /// Base URL blobs are readable under, without a trailing slash.
    pub fn blob_base_url(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "{}/{}",
                self.endpoint_url.trim_end_matches('/'),
                self.bucket_name
            ),
        }
    }
}

/// Presigns PUT URLs against an S3-compatible bucket.
#[derive(Clone)]
pub struct ObjectStoreSigner {
    client: Client,
    bucket: String,
    blob_base_url: String,
    ttl: Duration,
}

impl ObjectStoreSigner {
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vscore-storage",
        );

        let blob_base_url = config.blob_base_url();
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            blob_base_url,
            ttl: config.upload_url_ttl,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn blob_url(&self, blob_name: &str) -> String {
        format!("{}/{}", self.blob_base_url, urlencoding::encode(blob_name))
    }
}

#[async_trait]
impl UploadUrlSigner for ObjectStoreSigner {
    async fn issue(&self, blob_name: &str, content_type: &str) -> StorageResult<UploadTarget> {
        validate_blob_name(blob_name)?;

        let presign_config = PresigningConfig::expires_in(self.ttl)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(blob_name)
            .content_type(content_type)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        debug!(blob = blob_name, ttl_secs = self.ttl.as_secs(), "Issued upload URL");

        Ok(UploadTarget {
            upload_url: presigned.uri().to_string(),
            blob_url: self.blob_url(blob_name),
        })
    }
}
