use super::{join_url, validate_path, BlobStore};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// In-process blob store. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryBlobStore {
    public_base_url: String,
    objects: Mutex<BTreeMap<String, MemoryObject>>,
}

impl MemoryBlobStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Stored paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn get(&self, path: &str) -> Option<MemoryObject> {
        self.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemoryObject>> {
        // A poisoned map is still a valid map.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://magazines")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_path(path)?;
        let mut objects = self.lock();
        if objects.contains_key(path) {
            return Err(StorageError::AlreadyExists {
                path: path.to_string(),
            });
        }
        objects.insert(
            path.to_string(),
            MemoryObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }

    async fn delete(&self, paths: &[String]) -> StorageResult<()> {
        let mut objects = self.lock();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}
