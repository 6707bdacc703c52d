//! HTTP download of uploaded videos.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Fetches remote media into a local file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` into `dest`, which must not already exist.
    ///
    /// Returns the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64>;
}

/// Streaming [`MediaFetcher`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::download_failed(format!("failed to build client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64> {
        debug!("Downloading {} to {}", url, dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::download_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        // create_new: a leftover file means two runs share a path
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .await?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::download_failed(e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(bytes = written, "Downloaded {}", dest.display());
        Ok(written)
    }
}
