//! # magpress
//!
//! Turn a magazine issue uploaded as a PDF into hosted page images for a
//! page-flip reader.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   local file, URL, or bytes from an upload form
//!  ├─ 2. Parse   pdfium on a dedicated thread
//!  ├─ 3. Render  page N at 2× scale                ┐
//!  ├─ 4. Encode  JPEG, quality 95                  │ one page at a time,
//!  ├─ 5. Upload  covers/<ts>-page-1.jpg            │ in physical order
//!  │             pages/<ts>-page-N.jpg (no overwrite)
//!  └─ 6. Output  cover_url + ordered page_urls     ┘
//! ```
//!
//! Any failure aborts the whole job with one [`IngestError`]; objects the job
//! already uploaded are deleted unless `cleanup_on_failure` is turned off.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use magpress::{Ingestor, IngestConfig, LocalBlobStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LocalBlobStore::new("./public/magazines", "http://localhost:8080/magazines"));
//!     let ingestor = Ingestor::with_pdfium(store, IngestConfig::default());
//!     let output = ingestor.ingest(std::fs::read("spring-issue.pdf")?).await?;
//!     println!("cover: {}", output.cover_url);
//!     for url in &output.page_urls {
//!         println!("page:  {url}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `magpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! The reader side lives in [`layout`]: flipbook page sizing from the
//! viewport. Typed backend rows and the edit-form merge live in [`records`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod job;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod records;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IngestConfig, IngestConfigBuilder, JPEG_QUALITY, RENDER_SCALE};
pub use error::{IngestError, IngestStage, StorageError};
pub use ingest::{ingest_sync, inspect, Ingestor};
pub use job::{JobStatus, UploadJob};
pub use layout::{compute_layout, LayoutChange, LayoutTracker, ReaderLayout, Viewport};
pub use output::{IngestOutput, IngestStats};
pub use pipeline::render::{DocumentInfo, PdfRenderer, PdfiumRenderer, RenderSession};
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use records::{Magazine, MagazineDraft, RecordError};
pub use storage::{BlobStore, LocalBlobStore, MemoryBlobStore, RestBlobStore};
