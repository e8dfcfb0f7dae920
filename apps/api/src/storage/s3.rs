use async_trait::async_trait;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client};
use tracing::{info, warn};

use super::{BlobStore, StorageError};

/// S3 / MinIO backed store. Blob URLs are path-style: `{endpoint}/{bucket}/{key}`.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    endpoint: String,
}

impl S3BlobStore {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

fn backend<E: std::error::Error>(e: E) -> StorageError {
    StorageError::Backend(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(container).send().await.is_ok() {
            return Ok(());
        }
        warn!("Bucket {container} not found, creating it");
        self.client
            .create_bucket()
            .bucket(container)
            .send()
            .await
            .map_err(backend)?;
        info!("Created bucket {container}");
        Ok(())
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(backend)?;
        info!("Uploaded s3://{container}/{key} ({size} bytes)");
        Ok(self.url(container, key))
    }

    async fn get(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let output = match self.client.get_object().bucket(container).key(key).send().await {
            Ok(output) => output,
            Err(e) if e.as_service_error().map_or(false, |se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(backend(e)),
        };
        let bytes = output.body.collect().await.map_err(backend)?.into_bytes();
        Ok(Some(bytes.to_vec()))
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(backend)?;
        info!("Deleted s3://{container}/{key}");
        Ok(())
    }

    fn url(&self, container: &str, key: &str) -> String {
        format!("{}/{container}/{key}", self.endpoint)
    }
}
