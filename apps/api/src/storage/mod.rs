//! Blob storage behind a trait so handlers never see the SDK. Containers map
//! to buckets on S3-compatible stores.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod s3;
pub mod tracking;

pub use s3::S3BlobStore;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("tracking log error: {0}")]
    Tracking(#[from] csv::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates the container if it does not exist yet.
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError>;

    /// Uploads (overwriting) and returns the blob URL.
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// `Ok(None)` when the blob does not exist.
    async fn get(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError>;

    fn url(&self, container: &str, key: &str) -> String;
}

/// Guesses a content type from the key's extension for uploaded originals.
pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()).as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => DOCX_CONTENT_TYPE,
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("cv_20240101120000.PDF"), "application/pdf");
        assert_eq!(content_type_for("Resume_x.docx"), DOCX_CONTENT_TYPE);
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }
}
