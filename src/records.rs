//! Typed rows for the hosted backend and the magazine edit form.
//!
//! The backend returns untyped JSON rows. Rows are parsed into explicit
//! structs where they enter the crate so a missing or mistyped column fails
//! loudly with [`RecordError`] instead of surfacing later as a blank page.

use crate::output::IngestOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Table names used by the dashboard and reader.
pub mod tables {
    pub const MAGAZINES: &str = "magazines";
    pub const SUBMISSIONS: &str = "submissions";
    pub const FEEDBACK: &str = "feedback";
    pub const MAGAZINE_COMMENTS: &str = "magazine_comments";
    pub const EVENTS: &str = "events";
    pub const USER_PROFILES: &str = "user_profiles";
}

/// Storage bucket names.
pub mod buckets {
    pub const MAGAZINES: &str = "magazines";
    pub const EVENT_IMAGES: &str = "event-images";
    pub const STUDENT_SUBMISSIONS: &str = "student-submissions";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The row does not have the expected shape.
    #[error("invalid row in '{table}': {detail}")]
    InvalidRow { table: &'static str, detail: String },

    /// A draft is missing something required before saving.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}

/// One published (or draft) issue, as stored in the `magazines` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Magazine {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub page_urls: Vec<String>,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl Magazine {
    /// Parse a row returned by the backend.
    pub fn from_row(row: serde_json::Value) -> Result<Self, RecordError> {
        serde_json::from_value(row).map_err(|e| RecordError::InvalidRow {
            table: tables::MAGAZINES,
            detail: e.to_string(),
        })
    }

    /// Cover followed by pages: what the flipbook displays.
    pub fn reading_order(&self) -> Vec<&str> {
        self.cover_url
            .iter()
            .map(String::as_str)
            .chain(self.page_urls.iter().map(String::as_str))
            .collect()
    }

    /// Edit form pre-filled from this row.
    pub fn to_draft(&self) -> MagazineDraft {
        MagazineDraft {
            title: self.title.clone(),
            issue: self.issue.clone(),
            description: self.description.clone(),
            cover_url: self.cover_url.clone(),
            page_urls: self.page_urls.clone(),
            published: self.published,
        }
    }
}

/// State of the magazine create/edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MagazineDraft {
    pub title: String,
    pub issue: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub page_urls: Vec<String>,
    pub published: bool,
}

impl MagazineDraft {
    /// Replace the draft's images with the result of an ingestion job.
    pub fn apply_ingest(&mut self, output: &IngestOutput) {
        self.cover_url = Some(output.cover_url.clone());
        self.page_urls = output.page_urls.clone();
    }

    /// Check the draft can be written to the `magazines` table.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.title.trim().is_empty() {
            return Err(RecordError::MissingField("title"));
        }
        if self.published && self.cover_url.is_none() {
            return Err(RecordError::MissingField("cover_url"));
        }
        Ok(())
    }

    /// Insert/update payload for the backend.
    pub fn to_row(&self) -> Result<serde_json::Value, RecordError> {
        self.validate()?;
        serde_json::to_value(self).map_err(|e| RecordError::InvalidRow {
            table: tables::MAGAZINES,
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::IngestStats;
    use serde_json::json;

    fn row() -> serde_json::Value {
        json!({
            "id": 7,
            "title": "Spring Issue",
            "issue": "Vol. 3 No. 1",
            "cover_url": "https://cdn/covers/1-page-1.jpg",
            "page_urls": ["https://cdn/pages/2-page-2.jpg", "https://cdn/pages/3-page-3.jpg"],
            "published": true,
            "created_at": "2026-03-01T10:00:00Z"
        })
    }

    #[test]
    fn parses_row() {
        let m = Magazine::from_row(row()).unwrap();
        assert_eq!(m.id, 7);
        assert_eq!(m.reading_order().len(), 3);
        assert_eq!(m.reading_order()[0], "https://cdn/covers/1-page-1.jpg");
        assert!(m.description.is_none());
    }

    #[test]
    fn rejects_mistyped_page_urls() {
        let mut r = row();
        r["page_urls"] = json!("not-a-list");
        let err = Magazine::from_row(r).unwrap_err();
        assert!(matches!(err, RecordError::InvalidRow { table: "magazines", .. }));
    }

    #[test]
    fn missing_page_urls_defaults_empty() {
        let mut r = row();
        r.as_object_mut().unwrap().remove("page_urls");
        assert!(Magazine::from_row(r).unwrap().page_urls.is_empty());
    }

    #[test]
    fn draft_merges_ingest_output() {
        let mut draft = Magazine::from_row(row()).unwrap().to_draft();
        let output = IngestOutput {
            cover_url: "https://cdn/covers/9-page-1.jpg".into(),
            page_urls: vec!["https://cdn/pages/10-page-2.jpg".into()],
            stats: IngestStats::default(),
        };
        draft.apply_ingest(&output);
        assert_eq!(draft.cover_url.as_deref(), Some("https://cdn/covers/9-page-1.jpg"));
        assert_eq!(draft.page_urls, vec!["https://cdn/pages/10-page-2.jpg"]);
        assert_eq!(draft.title, "Spring Issue");
    }

    #[test]
    fn draft_validation() {
        let mut draft = MagazineDraft::default();
        assert_eq!(draft.validate(), Err(RecordError::MissingField("title")));
        draft.title = "Winter".into();
        draft.published = true;
        assert_eq!(draft.validate(), Err(RecordError::MissingField("cover_url")));
        draft.cover_url = Some("c".into());
        let row = draft.to_row().unwrap();
        assert_eq!(row["title"], "Winter");
        assert_eq!(row["published"], true);
    }
}
