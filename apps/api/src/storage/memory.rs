use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BlobStore, StorageError};

/// In-process store for tests. Failures can be injected per operation.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub fail_puts_to: Mutex<Option<String>>,
    pub fail_deletes: Mutex<bool>,
}

impl MemoryBlobStore {
    pub fn contents(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, container: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_container(&self, _container: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail_puts_to.lock().unwrap().as_deref() == Some(container) {
            return Err(StorageError::Backend(format!("put to {container} refused")));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data);
        Ok(self.url(container, key))
    }

    async fn get(&self, container: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.contents(container, key))
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(StorageError::Backend("delete refused".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .remove(&(container.to_string(), key.to_string()));
        Ok(())
    }

    fn url(&self, container: &str, key: &str) -> String {
        format!("memory://{container}/{key}")
    }
}
