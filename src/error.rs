//! Error types for the magpress library.
//!
//! * [`IngestError`]: **Fatal** for the whole job. Every ingestion failure
//!   surfaces as exactly one `IngestError`, no matter how many pages were
//!   already uploaded: the caller never sees a partial result.
//!
//! * [`StorageError`]: what a [`crate::storage::BlobStore`] backend reports.
//!   The pipeline wraps it in [`IngestError::UploadFailed`] together with the
//!   page number that was being written.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The supplied bytes could not be parsed as a PDF.
    #[error("Not a valid PDF document: {detail}")]
    InvalidDocument { detail: String },

    /// Rasterisation or JPEG encoding produced no usable output.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The blob store rejected or failed the write of one page.
    #[error("Upload failed for page {page}: {source}")]
    UploadFailed {
        page: usize,
        #[source]
        source: StorageError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pipeline stage an [`IngestError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    /// Resolving the path or URL to bytes.
    Input,
    /// Parsing the document.
    Parse,
    /// Rasterising or encoding a page.
    Render,
    /// Writing a page to blob storage.
    Upload,
    /// Configuration or library setup, before any page work.
    Setup,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStage::Input => "input",
            IngestStage::Parse => "parse",
            IngestStage::Render => "render",
            IngestStage::Upload => "upload",
            IngestStage::Setup => "setup",
        };
        f.write_str(name)
    }
}

impl IngestError {
    /// The stage that failed.
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::FileNotFound { .. }
            | IngestError::PermissionDenied { .. }
            | IngestError::InvalidInput { .. }
            | IngestError::DownloadFailed { .. }
            | IngestError::DownloadTimeout { .. } => IngestStage::Input,
            IngestError::InvalidDocument { .. } => IngestStage::Parse,
            IngestError::RenderFailed { .. } => IngestStage::Render,
            IngestError::UploadFailed { .. } => IngestStage::Upload,
            IngestError::InvalidConfig(_)
            | IngestError::PdfiumBindingFailed(_)
            | IngestError::Internal(_) => IngestStage::Setup,
        }
    }

    /// The 1-indexed page the failure is attributed to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            IngestError::RenderFailed { page, .. } | IngestError::UploadFailed { page, .. } => {
                Some(*page)
            }
            _ => None,
        }
    }
}

/// Errors reported by a blob-store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An object already exists at the path; uploads never overwrite.
    #[error("object already exists at '{path}'")]
    AlreadyExists { path: String },

    /// The storage service answered with a non-success status.
    #[error("storage rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response (DNS, TLS, connection reset…).
    #[error("storage transport error: {0}")]
    Transport(String),

    /// Local filesystem failure.
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object path is empty, absolute, or escapes the bucket.
    #[error("invalid object path '{0}'")]
    InvalidPath(String),
}

/// Convenience alias used by the storage backends.
pub type StorageResult<T> = Result<T, StorageError>;
