//! Object storage for uploaded videos.
//!
//! The API never handles video bytes. It hands the client a short-lived
//! signed PUT URL plus the permanent blob URL the pipeline later downloads
//! from.

pub mod client;
pub mod error;
pub mod mock;

pub use client::{ObjectStoreSigner, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use mock::MockUploadSigner;

use async_trait::async_trait;
use serde::Serialize;

/// Where the client uploads to and where the object will be readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub blob_url: String,
}

/// Issues write-capable URLs for new blobs.
#[async_trait]
pub trait UploadUrlSigner: Send + Sync {
    async fn issue(&self, blob_name: &str, content_type: &str) -> StorageResult<UploadTarget>;
}

/// Reject blob names that could escape the container.
///
/// `..` is only refused as a whole path segment; `clip..v2.mp4` is fine.
pub(crate) fn validate_blob_name(blob_name: &str) -> StorageResult<()> {
    if blob_name.is_empty()
        || blob_name.starts_with('/')
        || blob_name.split('/').any(|segment| segment == "..")
        || blob_name.chars().any(|c| c.is_control())
    {
        return Err(StorageError::InvalidKey(blob_name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_name_validation() {
        assert!(validate_blob_name("3f2a-clip one.mp4").is_ok());
        assert!(validate_blob_name("").is_err());
        assert!(validate_blob_name("/abs.mp4").is_err());
        assert!(validate_blob_name("a/../b.mp4").is_err());
        assert!(validate_blob_name("..").is_err());
        assert!(validate_blob_name("3f2a-trailer..final.mp4").is_ok());
        assert!(validate_blob_name("3f2a-..hidden.mp4").is_ok());
        assert!(validate_blob_name("a\nb").is_err());
    }
}
