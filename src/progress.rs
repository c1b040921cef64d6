//! Progress-callback trait for per-page ingestion events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to receive events
//! as the pipeline renders and uploads each page. Events are advisory: they
//! drive "processing…" notifications and progress bars, never control flow.
//!
//! # Example
//!
//! ```rust
//! use magpress::{IngestConfig, IngestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     uploaded: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for CountingCallback {
//!     fn on_page_uploaded(&self, page_num: usize, total_pages: usize, url: &str) {
//!         self.uploaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages} → {url}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { uploaded: AtomicUsize::new(0) });
//!
//! let config = IngestConfig::builder()
//!     .progress_callback(counter as Arc<dyn IngestProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the ingestion pipeline as it processes each page.
///
/// Pages are processed strictly one after another, so calls for one job never
/// overlap. Implementations must still be `Send + Sync` because several jobs
/// may share a callback. All methods default to no-ops.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once the document is parsed, before page 1 is rendered.
    fn on_ingest_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rasterised.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page is rendered and JPEG-encoded.
    ///
    /// `jpeg_len` is the encoded size in bytes.
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, jpeg_len: usize) {
        let _ = (page_num, total_pages, jpeg_len);
    }

    /// Called after a page's upload resolves and its public URL is known.
    fn on_page_uploaded(&self, page_num: usize, total_pages: usize, url: &str) {
        let _ = (page_num, total_pages, url);
    }

    /// Called once after every page is uploaded.
    ///
    /// `summary` is human readable, e.g. `"cover + 4 pages uploaded"`.
    fn on_ingest_complete(&self, total_pages: usize, summary: &str) {
        let _ = (total_pages, summary);
    }

    /// Called once when the job aborts.
    fn on_ingest_failed(&self, error: &str) {
        let _ = error;
    }

    /// Called after a failed job tried to delete what it had uploaded.
    ///
    /// `leftover` counts objects that could not be removed.
    fn on_cleanup(&self, removed: usize, leftover: usize) {
        let _ = (removed, leftover);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
