use super::{join_url, validate_path, BlobStore};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Blob store speaking the backend's storage REST API.
///
/// * upload: `POST {endpoint}/storage/v1/object/{bucket}/{path}` with
///   `x-upsert: false`
/// * public URL: `{endpoint}/storage/v1/object/public/{bucket}/{path}`
/// * delete: `DELETE {endpoint}/storage/v1/object/{bucket}` with
///   `{"prefixes": [...]}`
#[derive(Clone)]
pub struct RestBlobStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl std::fmt::Debug for RestBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBlobStore")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    prefixes: &'a [String],
}

impl RestBlobStore {
    /// Create a store for `bucket` on the project at `endpoint`.
    ///
    /// `api_key` is sent both as bearer token and `apikey` header, which is
    /// what the storage gateway expects for service and anon keys alike.
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| StorageError::Transport(format!("invalid API key: {e}")))?;
        let raw = HeaderValue::from_str(&api_key)
            .map_err(|e| StorageError::Transport(format!("invalid API key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", raw);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, path: &str) -> String {
        join_url(
            &format!("{}/storage/v1/object/{}", self.endpoint, self.bucket),
            path,
        )
    }

    fn bucket_url(&self) -> String {
        format!("{}/storage/v1/object/{}", self.endpoint, self.bucket)
    }
}

/// Map an error response to a [`StorageError`].
///
/// The gateway reports duplicates as 409, or as 400 with a "Duplicate" /
/// "already exists" message depending on version.
fn classify_failure(status: StatusCode, body: &str, path: &str) -> StorageError {
    let lower = body.to_ascii_lowercase();
    let duplicate = status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST
            && (lower.contains("duplicate") || lower.contains("already exists")));
    if duplicate {
        StorageError::AlreadyExists {
            path: path.to_string(),
        }
    } else {
        StorageError::Rejected {
            status: status.as_u16(),
            message: body.trim().to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_path(path)?;
        let size = data.len();
        let start = Instant::now();

        let response = self
            .client
            .post(self.object_url(path))
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %path,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Storage upload failed"
                );
                StorageError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_failure(status, &body, path);
            tracing::error!(
                error = %err,
                bucket = %self.bucket,
                key = %path,
                "Storage upload rejected"
            );
            return Err(err);
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Storage upload successful"
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(
            &format!("{}/storage/v1/object/public/{}", self.endpoint, self.bucket),
            path,
        )
    }

    async fn delete(&self, paths: &[String]) -> StorageResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .delete(self.bucket_url())
            .json(&DeleteRequest { prefixes: paths })
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            tracing::info!(bucket = %self.bucket, count = paths.len(), "Storage objects deleted");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StorageError::Rejected {
                status: status.as_u16(),
                message: body.trim().to_string(),
            })
        }
    }
}
