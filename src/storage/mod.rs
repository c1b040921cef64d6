//! Blob storage backends.
//!
//! The pipeline only needs three things from the remote object store: write
//! an object at a path without overwriting, turn a path into a public URL,
//! and delete objects (compensation for failed jobs). [`BlobStore`] captures
//! exactly that so the same pipeline runs against:
//!
//! * [`RestBlobStore`]: the hosted backend's storage REST API,
//! * [`LocalBlobStore`]: a directory served by any static file server,
//! * [`MemoryBlobStore`]: tests and dry runs.

mod local;
mod memory;
mod rest;

pub use local::LocalBlobStore;
pub use memory::{MemoryBlobStore, MemoryObject};
pub use rest::RestBlobStore;

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;

/// Object storage addressed by slash-separated paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` at `path`.
    ///
    /// Must fail with [`StorageError::AlreadyExists`] rather than replace an
    /// existing object.
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Public URL at which `path` is served.
    fn public_url(&self, path: &str) -> String;

    /// Delete every object in `paths`. Missing objects are not an error.
    async fn delete(&self, paths: &[String]) -> StorageResult<()>;
}

/// Reject paths that are empty, absolute, or try to leave the bucket.
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StorageError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
