//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The pipeline itself only ever sees bytes (an uploaded file never touches
//! the local disk), so this stage reads local files and downloads URLs fully
//! into memory. The PDF magic (`%PDF`) is checked here and again by
//! [`check_pdf_magic`] inside the pipeline so non-PDF uploads fail before the
//! rendering library is loaded.

use crate::error::IngestError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// PDF bytes together with a display name for logs and progress output.
#[derive(Debug, Clone)]
pub struct SourcePdf {
    /// File name (local) or last URL segment (remote).
    pub name: String,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// How far into the file the `%PDF-` header may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Reject buffers with no `%PDF-` header in their first 1024 bytes.
///
/// Leading bytes before the header (a BOM, a mail header) are accepted, as
/// pdfium accepts them.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), IngestError> {
    const HEADER: &[u8] = b"%PDF-";
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(HEADER.len()).any(|w| w == HEADER) {
        return Ok(());
    }
    Err(IngestError::InvalidDocument {
        detail: format!(
            "no %PDF- header in the first {} bytes, file starts with {:?}",
            window.len(),
            &window[..window.len().min(8)]
        ),
    })
}

/// Resolve the input string to PDF bytes.
pub async fn load_source(input: &str, timeout_secs: u64) -> Result<SourcePdf, IngestError> {
    if input.trim().is_empty() {
        return Err(IngestError::InvalidInput {
            input: input.to_string(),
        });
    }
    let source = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    check_pdf_magic(&source.bytes)?;
    Ok(source)
}

async fn read_local(path_str: &str) -> Result<SourcePdf, IngestError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(IngestError::PermissionDenied { path });
        }
        Err(_) => return Err(IngestError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(SourcePdf { name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourcePdf, IngestError> {
    info!("Downloading PDF from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| IngestError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| IngestError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            IngestError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            IngestError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(IngestError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| IngestError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());

    Ok(SourcePdf {
        name: filename_from_url(&parsed),
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment with an extension, or a fixed fallback.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty() && last.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
