//! Pipeline stages for PDF ingestion.
//!
//! Each submodule implements exactly one step; [`crate::ingest`] sequences
//! them per page.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ paths ──▶ storage
//! (bytes)   (pdfium)   (JPEG)    (key)     (upload + URL)
//! ```
//!
//! 1. [`input`]: read a local file or download a URL; check the `%PDF` magic
//! 2. [`render`]: parse and rasterise pages at 2× on a dedicated pdfium thread
//! 3. [`encode`]: JPEG-encode each bitmap at quality 95
//! 4. [`paths`]: compute the non-colliding `covers/…` / `pages/…` key

pub mod encode;
pub mod input;
pub mod paths;
pub mod render;
