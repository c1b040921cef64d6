//! In-memory state of one ingestion job.
//!
//! An [`UploadJob`] lives exactly as long as one call to
//! [`crate::Ingestor::ingest`]. It is never persisted: once the URLs are handed
//! back to the caller the job is dropped.
//!
//! ```text
//! Pending ──▶ Rendering ⇄ Uploading ──▶ Complete
//!    │            │           │
//!    └────────────┴───────────┴──────▶ Failed
//! ```

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an [`UploadJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Rendering,
    Uploading,
    Complete,
    Failed,
}

/// One page's progress through render and upload.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-indexed physical page number.
    pub page_number: usize,
    /// Encoded JPEG; released once the upload succeeds.
    pub image: Option<Vec<u8>>,
    /// Object path inside the bucket.
    pub destination_path: String,
    /// Public URL, set once the upload resolves.
    pub public_url: Option<String>,
}

/// One user-initiated PDF submission.
#[derive(Debug)]
pub struct UploadJob {
    id: Uuid,
    source_size: usize,
    page_count: Option<usize>,
    rendered_pages: Vec<RenderedPage>,
    cover_url: Option<String>,
    status: JobStatus,
}

impl UploadJob {
    pub fn new(source_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_size,
            page_count: None,
            rendered_pages: Vec::new(),
            cover_url: None,
            status: JobStatus::Pending,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_size(&self) -> usize {
        self.source_size
    }

    pub fn page_count(&self) -> Option<usize> {
        self.page_count
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn rendered_pages(&self) -> &[RenderedPage] {
        &self.rendered_pages
    }

    /// `Some` only once the job is complete.
    pub fn cover_url(&self) -> Option<&str> {
        self.cover_url.as_deref()
    }

    /// Record the parsed page count and start rendering.
    pub fn begin(&mut self, page_count: usize) -> Result<(), IngestError> {
        self.expect_status(&[JobStatus::Pending], "begin")?;
        if page_count == 0 {
            return Err(IngestError::InvalidDocument {
                detail: "document has no pages".into(),
            });
        }
        self.page_count = Some(page_count);
        self.status = JobStatus::Rendering;
        Ok(())
    }

    /// Append the next rendered page. Pages must arrive in physical order.
    pub fn push_rendered(
        &mut self,
        page_number: usize,
        image: Vec<u8>,
        destination_path: String,
    ) -> Result<(), IngestError> {
        self.expect_status(&[JobStatus::Rendering], "push_rendered")?;
        let page_count = self.page_count.unwrap_or(0);
        let expected = self.rendered_pages.len() + 1;
        if page_number != expected || page_number > page_count {
            return Err(IngestError::Internal(format!(
                "page {page_number} out of order (expected {expected} of {page_count})"
            )));
        }
        self.rendered_pages.push(RenderedPage {
            page_number,
            image: Some(image),
            destination_path,
            public_url: None,
        });
        self.status = JobStatus::Uploading;
        Ok(())
    }

    /// Take the encoded image of the page waiting to be uploaded.
    pub fn take_pending_image(&mut self) -> Result<Vec<u8>, IngestError> {
        self.expect_status(&[JobStatus::Uploading], "take_pending_image")?;
        self.rendered_pages
            .last_mut()
            .and_then(|p| p.image.take())
            .ok_or_else(|| IngestError::Internal("no encoded image awaiting upload".into()))
    }

    /// Record the public URL of the page that was just uploaded.
    pub fn record_upload(&mut self, public_url: String) -> Result<(), IngestError> {
        self.expect_status(&[JobStatus::Uploading], "record_upload")?;
        let page = self
            .rendered_pages
            .last_mut()
            .ok_or_else(|| IngestError::Internal("upload recorded before any render".into()))?;
        page.image = None;
        page.public_url = Some(public_url);
        self.status = JobStatus::Rendering;
        Ok(())
    }

    /// Finish the job, returning `(cover_url, page_urls)`.
    pub fn complete(&mut self) -> Result<(String, Vec<String>), IngestError> {
        self.expect_status(&[JobStatus::Rendering], "complete")?;
        let page_count = self.page_count.unwrap_or(0);
        if self.rendered_pages.len() != page_count {
            return Err(IngestError::Internal(format!(
                "completed with {} of {} pages",
                self.rendered_pages.len(),
                page_count
            )));
        }

        let mut urls = self.rendered_pages.iter().map(|p| p.public_url.clone());
        let cover_url = urls
            .next()
            .flatten()
            .ok_or_else(|| IngestError::Internal("cover page has no URL".into()))?;
        let page_urls = urls
            .map(|u| u.ok_or_else(|| IngestError::Internal("page without URL".into())))
            .collect::<Result<Vec<_>, _>>()?;

        self.cover_url = Some(cover_url.clone());
        self.status = JobStatus::Complete;
        Ok((cover_url, page_urls))
    }

    /// Mark the job failed. Idempotent.
    pub fn fail(&mut self) {
        self.cover_url = None;
        self.status = JobStatus::Failed;
    }

    /// Paths already written to storage by this job.
    pub fn uploaded_paths(&self) -> Vec<String> {
        self.rendered_pages
            .iter()
            .filter(|p| p.public_url.is_some())
            .map(|p| p.destination_path.clone())
            .collect()
    }

    fn expect_status(&self, allowed: &[JobStatus], op: &str) -> Result<(), IngestError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(IngestError::Internal(format!(
                "{op} not allowed while job is {:?}",
                self.status
            )))
        }
    }
}
