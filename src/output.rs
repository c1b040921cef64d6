//! Result types returned by a successful ingestion.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hosted URLs for one ingested issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestOutput {
    /// Public URL of page 1.
    pub cover_url: String,
    /// Public URLs of pages 2..N, in physical page order.
    pub page_urls: Vec<String>,
    /// Timing and size figures.
    pub stats: IngestStats,
}

impl IngestOutput {
    /// Human-readable outcome, e.g. `"cover + 4 pages uploaded"`.
    pub fn summary(&self) -> String {
        match self.page_urls.len() {
            1 => "cover + 1 page uploaded".to_string(),
            n => format!("cover + {n} pages uploaded"),
        }
    }

    /// Cover followed by every page, i.e. the full reading order.
    pub fn all_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.cover_url.as_str()).chain(self.page_urls.iter().map(String::as_str))
    }
}

/// Per-job statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestStats {
    pub job_id: Uuid,
    pub page_count: usize,
    pub source_bytes: usize,
    pub uploaded_bytes: u64,
    pub render_duration_ms: u64,
    pub upload_duration_ms: u64,
    pub total_duration_ms: u64,
}
