//! Configuration types for PDF ingestion.
//!
//! All pipeline behaviour that may vary between deployments is controlled
//! through [`IngestConfig`], built via its [`IngestConfigBuilder`]. Render
//! scale and JPEG quality are constants, not configuration.

use crate::error::IngestError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Oversampling factor applied to each page's natural size (PDF points).
pub const RENDER_SCALE: f32 = 2.0;

/// JPEG quality on the 1–100 scale (0.95 on the 0–1 scale).
pub const JPEG_QUALITY: u8 = 95;

/// Content type attached to every uploaded page image.
pub const PAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Configuration for an ingestion job.
///
/// Built via [`IngestConfig::builder()`] or using [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use magpress::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .covers_prefix("covers")
///     .pages_prefix("pages")
///     .cleanup_on_failure(false)
///     .build()
///     .unwrap();
/// assert!(!config.cleanup_on_failure);
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Folder that receives page 1. Default: `"covers"`.
    pub covers_prefix: String,

    /// Folder that receives pages 2..N. Default: `"pages"`.
    pub pages_prefix: String,

    /// Delete objects already uploaded by a job that later fails. Default: true.
    ///
    /// With `false`, a failed job leaves its earlier pages in storage; a retry
    /// uploads everything again under fresh paths.
    pub cleanup_on_failure: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library.
    ///
    /// When `None`, `PDFIUM_LIB_PATH` is consulted, then the working directory,
    /// then the system library search path.
    pub pdfium_library_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            covers_prefix: "covers".to_string(),
            pages_prefix: "pages".to_string(),
            cleanup_on_failure: true,
            password: None,
            pdfium_library_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("covers_prefix", &self.covers_prefix)
            .field("pages_prefix", &self.pages_prefix)
            .field("cleanup_on_failure", &self.cleanup_on_failure)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn covers_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.covers_prefix = prefix.into();
        self
    }

    pub fn pages_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.pages_prefix = prefix.into();
        self
    }

    pub fn cleanup_on_failure(mut self, v: bool) -> Self {
        self.config.cleanup_on_failure = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        validate_prefix("covers_prefix", &c.covers_prefix)?;
        validate_prefix("pages_prefix", &c.pages_prefix)?;
        if c.covers_prefix == c.pages_prefix {
            return Err(IngestError::InvalidConfig(format!(
                "covers and pages must use different folders, both are '{}'",
                c.covers_prefix
            )));
        }
        if c.download_timeout_secs == 0 {
            return Err(IngestError::InvalidConfig(
                "download timeout must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

fn validate_prefix(field: &str, prefix: &str) -> Result<(), IngestError> {
    if prefix.trim().is_empty() {
        return Err(IngestError::InvalidConfig(format!("{field} must not be empty")));
    }
    if prefix.contains('/') || prefix.contains('\\') || prefix == "." || prefix == ".." {
        return Err(IngestError::InvalidConfig(format!(
            "{field} must be a single folder name, got '{prefix}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = IngestConfig::default();
        assert_eq!(c.covers_prefix, "covers");
        assert_eq!(c.pages_prefix, "pages");
        assert!(c.cleanup_on_failure);
        assert_eq!(c.download_timeout_secs, 120);
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn fixed_render_constants() {
        assert_eq!(RENDER_SCALE, 2.0);
        assert_eq!(JPEG_QUALITY, 95);
    }

    #[test]
    fn builder_rejects_nested_prefix() {
        let err = IngestConfig::builder()
            .covers_prefix("issues/covers")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("covers_prefix"), "got: {err}");
    }

    #[test]
    fn builder_rejects_shared_folder() {
        let err = IngestConfig::builder()
            .covers_prefix("img")
            .pages_prefix("img")
            .build()
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_prefix() {
        assert!(IngestConfig::builder().pages_prefix("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = IngestConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
