//! Ingestion entry points.
//!
//! [`Ingestor::ingest`] turns PDF bytes into hosted page images, one page at a
//! time: render → encode → upload → resolve URL, and only then the next page.
//! The whole job is all-or-nothing for the caller: the first failure aborts
//! the loop and is returned as a single [`IngestError`]. Objects uploaded
//! before the failure are deleted when `cleanup_on_failure` is set.

use crate::config::{IngestConfig, PAGE_CONTENT_TYPE};
use crate::error::IngestError;
use crate::job::UploadJob;
use crate::output::{IngestOutput, IngestStats};
use crate::pipeline::render::{DocumentInfo, PdfRenderer, PdfiumRenderer};
use crate::pipeline::{encode, input, paths};
use crate::storage::BlobStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

/// Runs ingestion jobs against one renderer and one blob store.
#[derive(Clone)]
pub struct Ingestor {
    renderer: Arc<dyn PdfRenderer>,
    store: Arc<dyn BlobStore>,
    config: IngestConfig,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("renderer", &"<dyn PdfRenderer>")
            .field("store", &"<dyn BlobStore>")
            .field("config", &self.config)
            .finish()
    }
}

impl Ingestor {
    /// Build an ingestor with an explicit renderer.
    pub fn new(
        renderer: Arc<dyn PdfRenderer>,
        store: Arc<dyn BlobStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            renderer,
            store,
            config,
        }
    }

    /// Build an ingestor that renders with pdfium, configured from `config`.
    pub fn with_pdfium(store: Arc<dyn BlobStore>, config: IngestConfig) -> Self {
        let renderer = PdfiumRenderer::new(
            config.pdfium_library_path.clone(),
            config.password.clone(),
        );
        Self::new(Arc::new(renderer), store, config)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest a PDF given as a local path or http(s) URL.
    pub async fn ingest_source(&self, input_str: &str) -> Result<IngestOutput, IngestError> {
        let source = input::load_source(input_str, self.config.download_timeout_secs).await?;
        info!("Ingesting {} ({} bytes)", source.name, source.bytes.len());
        self.ingest(source.bytes).await
    }

    /// Ingest PDF bytes, returning the cover URL and ordered page URLs.
    ///
    /// # Errors
    /// * [`IngestError::InvalidDocument`]: not a PDF, unparseable, or no pages
    /// * [`IngestError::RenderFailed`]: a page rendered or encoded to nothing
    /// * [`IngestError::UploadFailed`]: the store rejected a page
    pub async fn ingest(&self, pdf: Vec<u8>) -> Result<IngestOutput, IngestError> {
        let mut job = UploadJob::new(pdf.len());
        let span = tracing::info_span!("ingest", job_id = %job.id());

        async {
            match self.run(&mut job, pdf).await {
                Ok(output) => {
                    info!(
                        "Ingestion complete: {} in {}ms",
                        output.summary(),
                        output.stats.total_duration_ms
                    );
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_ingest_complete(output.stats.page_count, &output.summary());
                    }
                    Ok(output)
                }
                Err(e) => {
                    job.fail();
                    warn!(stage = %e.stage(), page = ?e.page(), "Ingestion failed: {}", e);
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_ingest_failed(&e.to_string());
                    }
                    self.compensate(&job).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, job: &mut UploadJob, pdf: Vec<u8>) -> Result<IngestOutput, IngestError> {
        let total_start = Instant::now();
        input::check_pdf_magic(&pdf)?;

        // ── Step 1: Parse ────────────────────────────────────────────────
        let mut session = self.renderer.open(pdf).await?;
        let total_pages = session.page_count();
        job.begin(total_pages)?;
        info!("PDF has {} pages", total_pages);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_ingest_start(total_pages);
        }

        let mut render_time = Duration::ZERO;
        let mut upload_time = Duration::ZERO;
        let mut uploaded_bytes: u64 = 0;

        // ── Step 2: Render + upload, strictly in page order ─────────────
        for page_number in 1..=total_pages {
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_page_start(page_number, total_pages);
            }

            let render_start = Instant::now();
            let image = session.render_page(page_number).await?;
            let jpeg = encode::encode_page_blocking(page_number, image).await?;
            render_time += render_start.elapsed();

            let jpeg_len = jpeg.len();
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_page_rendered(page_number, total_pages, jpeg_len);
            }

            let path = paths::destination_path(&self.config, page_number, paths::TIMESTAMPS.next());
            job.push_rendered(page_number, jpeg, path.clone())?;

            let upload_start = Instant::now();
            let data = job.take_pending_image()?;
            self.store
                .upload(&path, data, PAGE_CONTENT_TYPE)
                .await
                .map_err(|source| IngestError::UploadFailed {
                    page: page_number,
                    source,
                })?;
            upload_time += upload_start.elapsed();
            uploaded_bytes += jpeg_len as u64;

            let url = self.store.public_url(&path);
            debug!(page = page_number, path = %path, "Uploaded page → {}", url);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_page_uploaded(page_number, total_pages, &url);
            }
            job.record_upload(url)?;
        }

        // ── Step 3: Collect URLs ─────────────────────────────────────────
        drop(session);
        let (cover_url, page_urls) = job.complete()?;

        Ok(IngestOutput {
            cover_url,
            page_urls,
            stats: IngestStats {
                job_id: job.id(),
                page_count: total_pages,
                source_bytes: job.source_size(),
                uploaded_bytes,
                render_duration_ms: render_time.as_millis() as u64,
                upload_duration_ms: upload_time.as_millis() as u64,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
            },
        })
    }

    /// Delete what a failed job managed to upload.
    ///
    /// Best effort: a delete failure is logged and reported to the progress
    /// callback, but the job's original error is what the caller sees.
    async fn compensate(&self, job: &UploadJob) {
        let uploaded = job.uploaded_paths();
        if uploaded.is_empty() {
            return;
        }
        if !self.config.cleanup_on_failure {
            warn!(
                "Leaving {} orphaned object(s) in storage: {:?}",
                uploaded.len(),
                uploaded
            );
            return;
        }

        let (removed, leftover) = match self.store.delete(&uploaded).await {
            Ok(()) => {
                info!("Removed {} object(s) uploaded by the failed job", uploaded.len());
                (uploaded.len(), 0)
            }
            Err(e) => {
                warn!(
                    "Cleanup failed, {} object(s) left in storage: {}",
                    uploaded.len(),
                    e
                );
                (0, uploaded.len())
            }
        };
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_cleanup(removed, leftover);
        }
    }
}

/// Read page count and metadata of a PDF (path or URL) without uploading.
///
/// Only the pdfium library is needed; no storage backend is touched.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &IngestConfig,
) -> Result<DocumentInfo, IngestError> {
    let source = input::load_source(input_str.as_ref(), config.download_timeout_secs).await?;
    PdfiumRenderer::new(config.pdfium_library_path.clone(), config.password.clone())
        .inspect(source.bytes)
        .await
}

/// Synchronous wrapper around [`Ingestor::ingest`].
///
/// Creates a temporary tokio runtime internally.
pub fn ingest_sync(ingestor: &Ingestor, pdf: Vec<u8>) -> Result<IngestOutput, IngestError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| IngestError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(ingestor.ingest(pdf))
}
