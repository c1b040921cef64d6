//! Image encoding: `DynamicImage` → JPEG bytes at a fixed quality.
//!
//! JPEG has no alpha channel; the bitmap is flattened to RGB first.

use crate::config::JPEG_QUALITY;
use crate::error::IngestError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rasterised page as JPEG at [`JPEG_QUALITY`].
///
/// Fails with [`IngestError::RenderFailed`] when the bitmap is empty or the
/// encoder produces no output.
pub fn encode_page(page_number: usize, img: &DynamicImage) -> Result<Vec<u8>, IngestError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(IngestError::RenderFailed {
            page: page_number,
            detail: format!("empty bitmap ({}x{})", img.width(), img.height()),
        });
    }

    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| IngestError::RenderFailed {
            page: page_number,
            detail: format!("JPEG encoding failed: {e}"),
        })?;

    if buf.is_empty() {
        return Err(IngestError::RenderFailed {
            page: page_number,
            detail: "JPEG encoder produced no output".into(),
        });
    }

    debug!("Encoded page {} → {} bytes JPEG", page_number, buf.len());
    Ok(buf)
}

/// Run [`encode_page`] on the blocking pool; encoding is CPU-bound.
pub async fn encode_page_blocking(
    page_number: usize,
    img: DynamicImage,
) -> Result<Vec<u8>, IngestError> {
    tokio::task::spawn_blocking(move || encode_page(page_number, &img))
        .await
        .map_err(|e| IngestError::Internal(format!("Encode task panicked: {e}")))?
}
