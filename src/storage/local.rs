use super::{join_url, validate_path, BlobStore};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Blob store backed by a local directory.
///
/// Objects are plain files under `root`; a static file server publishes
/// `root` at `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg)))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let file_path = self.file_path(path)?;
        let io_err = |source: std::io::Error| StorageError::Io {
            path: file_path.clone(),
            source,
        };

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists {
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        write_or_discard(&mut file, &data, &file_path)
            .await
            .map_err(io_err)?;

        info!(path = %path, size_bytes = data.len(), "Local upload successful");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }

    async fn delete(&self, paths: &[String]) -> StorageResult<()> {
        for path in paths {
            let file_path = self.file_path(path)?;
            match tokio::fs::remove_file(&file_path).await {
                Ok(()) => debug!(path = %path, "Deleted local object"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StorageError::Io {
                        path: file_path,
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

/// Write `data` to a freshly created file. On failure the partial file at
/// `file_path` is removed so no half-written object is left behind.
async fn write_or_discard<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
    file_path: &Path,
) -> std::io::Result<()> {
    let result = match writer.write_all(data).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    if let Err(ref e) = result {
        debug!("Write to {} failed ({}), removing partial file", file_path.display(), e);
        if let Err(rm) = tokio::fs::remove_file(file_path).await {
            warn!("Could not remove partial file {}: {}", file_path.display(), rm);
        }
    }
    result
}
