//! Destination paths for uploaded page images.
//!
//! Page 1 always goes to the covers folder and every other page to the pages
//! folder: `covers/<ts>-page-1.jpg`, `pages/<ts>-page-<N>.jpg`. The timestamp
//! is captured per page, in epoch milliseconds.
//!
//! Uploads never overwrite, so two jobs must never compute the same path.
//! Wall-clock milliseconds alone do not guarantee that (a fast retry can land
//! in the same millisecond), so [`TimestampSource`] hands out strictly
//! increasing values: the clock reading, bumped past the last value issued.

use crate::config::IngestConfig;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Strictly increasing millisecond timestamps.
#[derive(Debug, Default)]
pub struct TimestampSource {
    last: AtomicI64,
}

impl TimestampSource {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next timestamp: `max(now_ms, last + 1)`.
    pub fn next(&self) -> i64 {
        self.next_after(Utc::now().timestamp_millis())
    }

    fn next_after(&self, now_ms: i64) -> i64 {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Process-wide source shared by every [`crate::Ingestor`].
pub static TIMESTAMPS: TimestampSource = TimestampSource::new();

/// Which folder a page image belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Cover,
    Page,
}

impl Destination {
    pub fn for_page(page_number: usize) -> Self {
        if page_number == 1 {
            Destination::Cover
        } else {
            Destination::Page
        }
    }
}

/// Object path for `page_number` captured at `timestamp_ms`.
pub fn destination_path(config: &IngestConfig, page_number: usize, timestamp_ms: i64) -> String {
    let folder = match Destination::for_page(page_number) {
        Destination::Cover => &config.covers_prefix,
        Destination::Page => &config.pages_prefix,
    };
    format!("{folder}/{timestamp_ms}-page-{page_number}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_and_page_folders() {
        let c = IngestConfig::default();
        assert_eq!(
            destination_path(&c, 1, 1_700_000_000_000),
            "covers/1700000000000-page-1.jpg"
        );
        assert_eq!(
            destination_path(&c, 2, 1_700_000_000_001),
            "pages/1700000000001-page-2.jpg"
        );
        assert_eq!(destination_path(&c, 12, 5), "pages/5-page-12.jpg");
    }

    #[test]
    fn custom_prefixes() {
        let c = IngestConfig::builder()
            .covers_prefix("issue-covers")
            .pages_prefix("issue-pages")
            .build()
            .unwrap();
        assert!(destination_path(&c, 1, 9).starts_with("issue-covers/"));
        assert!(destination_path(&c, 3, 9).starts_with("issue-pages/"));
    }

    #[test]
    fn timestamps_strictly_increase_under_a_frozen_clock() {
        let source = TimestampSource::new();
        let a = source.next_after(1_000);
        let b = source.next_after(1_000);
        let c = source.next_after(999);
        assert_eq!((a, b, c), (1_000, 1_001, 1_002));
        assert_eq!(source.next_after(5_000), 5_000);
    }

    #[test]
    fn timestamps_unique_across_threads() {
        let source = std::sync::Arc::new(TimestampSource::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = std::sync::Arc::clone(&source);
                std::thread::spawn(move || (0..250).map(|_| s.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let before = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), before);
    }
}
