//! Pipeline tests with a scripted renderer and an in-memory store.
//!
//! No pdfium library is needed: [`ScriptedRenderer`] stands in for the PDF
//! engine and [`RecordingStore`] wraps [`MemoryBlobStore`] so tests can
//! inject upload/delete failures and observe call order.

use async_trait::async_trait;
use image::DynamicImage;
use magpress::{
    BlobStore, IngestConfig, IngestError, IngestProgressCallback, IngestStage, Ingestor,
    MemoryBlobStore, PdfRenderer, RenderSession, StorageError,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const BASE: &str = "https://cdn.test/magazines";
const PDF: &[u8] = b"%PDF-1.7\n% scripted document\n%%EOF";

// ── Test doubles ─────────────────────────────────────────────────────────────

type EventLog = Arc<Mutex<Vec<String>>>;

fn push(log: &EventLog, event: String) {
    log.lock().unwrap().push(event);
}

fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Renders `pages` solid-colour pages; optionally fails to open or to render
/// one page.
#[derive(Clone)]
struct ScriptedRenderer {
    pages: usize,
    fail_open: bool,
    fail_render_at: Option<usize>,
    log: EventLog,
}

impl ScriptedRenderer {
    fn new(pages: usize, log: &EventLog) -> Self {
        Self {
            pages,
            fail_open: false,
            fail_render_at: None,
            log: log.clone(),
        }
    }
}

struct ScriptedSession {
    pages: usize,
    fail_render_at: Option<usize>,
    log: EventLog,
}

#[async_trait]
impl PdfRenderer for ScriptedRenderer {
    async fn open(&self, pdf: Vec<u8>) -> Result<Box<dyn RenderSession>, IngestError> {
        push(&self.log, "open".into());
        assert!(pdf.starts_with(b"%PDF"));
        if self.fail_open {
            return Err(IngestError::InvalidDocument {
                detail: "corrupt xref table".into(),
            });
        }
        Ok(Box::new(ScriptedSession {
            pages: self.pages,
            fail_render_at: self.fail_render_at,
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl RenderSession for ScriptedSession {
    fn page_count(&self) -> usize {
        self.pages
    }

    async fn render_page(&mut self, page_number: usize) -> Result<DynamicImage, IngestError> {
        push(&self.log, format!("render:{page_number}"));
        if self.fail_render_at == Some(page_number) {
            return Err(IngestError::RenderFailed {
                page: page_number,
                detail: "scripted failure".into(),
            });
        }
        // 2× scale of a tiny 480:700 page.
        Ok(DynamicImage::new_rgb8(48, 70))
    }
}

/// Memory store that logs every call and can be told to fail.
struct RecordingStore {
    inner: MemoryBlobStore,
    fail_upload_page: Option<usize>,
    fail_delete: bool,
    log: EventLog,
}

impl RecordingStore {
    fn new(log: &EventLog) -> Self {
        Self {
            inner: MemoryBlobStore::new(BASE),
            fail_upload_page: None,
            fail_delete: false,
            log: log.clone(),
        }
    }
}

fn page_of(path: &str) -> usize {
    path.rsplit("-page-")
        .next()
        .and_then(|s| s.strip_suffix(".jpg"))
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("unexpected object path: {path}"))
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let page = page_of(path);
        push(&self.log, format!("upload:{page}"));
        if self.fail_upload_page == Some(page) {
            return Err(StorageError::Rejected {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        self.inner.upload(path, data, content_type).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    async fn delete(&self, paths: &[String]) -> Result<(), StorageError> {
        push(&self.log, format!("delete:{}", paths.len()));
        if self.fail_delete {
            return Err(StorageError::Transport("connection reset".into()));
        }
        self.inner.delete(paths).await
    }
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl IngestProgressCallback for RecordingCallback {
    fn on_ingest_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start:{total_pages}"));
    }
    fn on_page_uploaded(&self, page_num: usize, _total_pages: usize, _url: &str) {
        self.events.lock().unwrap().push(format!("uploaded:{page_num}"));
    }
    fn on_ingest_complete(&self, _total_pages: usize, summary: &str) {
        self.events.lock().unwrap().push(format!("complete:{summary}"));
    }
    fn on_ingest_failed(&self, _error: &str) {
        self.events.lock().unwrap().push("failed".into());
    }
    fn on_cleanup(&self, removed: usize, leftover: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("cleanup:{removed}:{leftover}"));
    }
}

fn ingestor(renderer: ScriptedRenderer, store: Arc<RecordingStore>, config: IngestConfig) -> Ingestor {
    Ingestor::new(Arc::new(renderer), store, config)
}

/// Split `https://cdn.test/magazines/<folder>/<ts>-page-<n>.jpg`.
fn parse_url(url: &str) -> (String, i64, usize) {
    let rest = url
        .strip_prefix(&format!("{BASE}/"))
        .unwrap_or_else(|| panic!("url not under base: {url}"));
    let (folder, file) = rest.split_once('/').expect("folder/file");
    let (ts, page) = file
        .strip_suffix(".jpg")
        .and_then(|f| f.split_once("-page-"))
        .expect("<ts>-page-<n>.jpg");
    (folder.to_string(), ts.parse().unwrap(), page.parse().unwrap())
}

// ── Success paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_page_issue_yields_cover_and_two_pages() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(3, &log), store.clone(), IngestConfig::default());

    let out = ing.ingest(PDF.to_vec()).await.unwrap();

    let (folder, _, page) = parse_url(&out.cover_url);
    assert_eq!((folder.as_str(), page), ("covers", 1));
    assert_eq!(out.page_urls.len(), 2);
    for (i, url) in out.page_urls.iter().enumerate() {
        let (folder, _, page) = parse_url(url);
        assert_eq!(folder, "pages");
        assert_eq!(page, i + 2);
    }
    assert_eq!(out.stats.page_count, 3);
    assert_eq!(out.stats.source_bytes, PDF.len());
    assert_eq!(out.summary(), "cover + 2 pages uploaded");
    assert_eq!(store.inner.len(), 3);
}

#[tokio::test]
async fn single_page_issue_has_no_pages() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(1, &log), store.clone(), IngestConfig::default());

    let out = ing.ingest(PDF.to_vec()).await.unwrap();

    assert_eq!(parse_url(&out.cover_url).2, 1);
    assert!(out.page_urls.is_empty());
    assert_eq!(store.inner.paths().len(), 1);
    assert!(store.inner.paths()[0].starts_with("covers/"));
}

#[tokio::test]
async fn five_page_issue_keeps_reading_order_and_fresh_timestamps() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(5, &log), store.clone(), IngestConfig::default());

    let out = ing.ingest(PDF.to_vec()).await.unwrap();

    let parsed: Vec<_> = out.all_urls().map(parse_url).collect();
    let pages: Vec<usize> = parsed.iter().map(|p| p.2).collect();
    assert_eq!(pages, vec![1, 2, 3, 4, 5]);
    let stamps: Vec<i64> = parsed.iter().map(|p| p.1).collect();
    assert!(
        stamps.windows(2).all(|w| w[0] < w[1]),
        "timestamps must strictly increase: {stamps:?}"
    );
}

#[tokio::test]
async fn uploads_are_jpeg() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(2, &log), store.clone(), IngestConfig::default());
    ing.ingest(PDF.to_vec()).await.unwrap();

    for path in store.inner.paths() {
        let obj = store.inner.get(&path).unwrap();
        assert_eq!(obj.content_type, "image/jpeg");
        assert_eq!(&obj.data[..2], &[0xFF, 0xD8], "{path} is not a JPEG");
    }
}

#[tokio::test]
async fn pages_are_processed_strictly_in_sequence() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(3, &log), store, IngestConfig::default());

    ing.ingest(PDF.to_vec()).await.unwrap();

    assert_eq!(
        events(&log),
        vec!["open", "render:1", "upload:1", "render:2", "upload:2", "render:3", "upload:3"]
    );
}

#[tokio::test]
async fn custom_prefixes_are_used() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let config = IngestConfig::builder()
        .covers_prefix("front")
        .pages_prefix("inside")
        .build()
        .unwrap();
    let ing = ingestor(ScriptedRenderer::new(2, &log), store, config);

    let out = ing.ingest(PDF.to_vec()).await.unwrap();
    assert_eq!(parse_url(&out.cover_url).0, "front");
    assert_eq!(parse_url(&out.page_urls[0]).0, "inside");
}

#[tokio::test]
async fn retrying_the_same_file_never_reuses_paths() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(3, &log), store.clone(), IngestConfig::default());

    let first: HashSet<String> = ing
        .ingest(PDF.to_vec())
        .await
        .unwrap()
        .all_urls()
        .map(String::from)
        .collect();
    let second: HashSet<String> = ing
        .ingest(PDF.to_vec())
        .await
        .unwrap()
        .all_urls()
        .map(String::from)
        .collect();

    assert!(first.is_disjoint(&second));
    assert_eq!(store.inner.len(), 6);
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_failure_aborts_and_cleans_up() {
    let log = EventLog::default();
    let mut store = RecordingStore::new(&log);
    store.fail_upload_page = Some(3);
    let store = Arc::new(store);
    let ing = ingestor(ScriptedRenderer::new(5, &log), store.clone(), IngestConfig::default());

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();

    assert!(matches!(err, IngestError::UploadFailed { page: 3, .. }), "got {err:?}");
    assert_eq!(err.stage(), IngestStage::Upload);
    assert_eq!(err.page(), Some(3));
    assert!(store.inner.is_empty(), "pages 1-2 must be removed");

    let ev = events(&log);
    assert!(!ev.contains(&"render:4".to_string()), "no page after the failure");
    assert_eq!(ev.last().map(String::as_str), Some("delete:2"));
}

#[tokio::test]
async fn last_page_failure_names_page_and_cause() {
    let log = EventLog::default();
    let mut store = RecordingStore::new(&log);
    store.fail_upload_page = Some(2);
    let store = Arc::new(store);
    let ing = ingestor(ScriptedRenderer::new(2, &log), store.clone(), IngestConfig::default());

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("page 2"), "{msg}");
    assert!(msg.contains("service unavailable"), "{msg}");
    match err {
        IngestError::UploadFailed { source, .. } => {
            assert!(matches!(source, StorageError::Rejected { status: 503, .. }))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn keep_orphans_leaves_earlier_pages() {
    let log = EventLog::default();
    let mut store = RecordingStore::new(&log);
    store.fail_upload_page = Some(3);
    let store = Arc::new(store);
    let config = IngestConfig::builder().cleanup_on_failure(false).build().unwrap();
    let ing = ingestor(ScriptedRenderer::new(4, &log), store.clone(), config);

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();

    assert_eq!(err.page(), Some(3));
    assert_eq!(store.inner.len(), 2);
    assert!(!events(&log).iter().any(|e| e.starts_with("delete")));
}

#[tokio::test]
async fn render_failure_reports_page() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let mut renderer = ScriptedRenderer::new(4, &log);
    renderer.fail_render_at = Some(2);
    let ing = ingestor(renderer, store.clone(), IngestConfig::default());

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();

    assert!(matches!(err, IngestError::RenderFailed { page: 2, .. }));
    assert_eq!(err.stage(), IngestStage::Render);
    assert!(store.inner.is_empty());
    assert!(!events(&log).contains(&"upload:2".to_string()));
}

#[tokio::test]
async fn non_pdf_bytes_are_rejected_before_rendering() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(3, &log), store, IngestConfig::default());

    let err = ing.ingest(b"PK\x03\x04 not a pdf".to_vec()).await.unwrap_err();

    assert!(matches!(err, IngestError::InvalidDocument { .. }));
    assert_eq!(err.stage(), IngestStage::Parse);
    assert!(events(&log).is_empty(), "renderer must not be opened");
}

#[tokio::test]
async fn unparseable_document_fails_without_uploads() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let mut renderer = ScriptedRenderer::new(3, &log);
    renderer.fail_open = true;
    let ing = ingestor(renderer, store.clone(), IngestConfig::default());

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();

    assert!(matches!(err, IngestError::InvalidDocument { .. }));
    assert_eq!(events(&log), vec!["open"]);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn zero_page_document_is_invalid() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let ing = ingestor(ScriptedRenderer::new(0, &log), store, IngestConfig::default());

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidDocument { .. }));
}

// ── Progress reporting ───────────────────────────────────────────────────────

#[tokio::test]
async fn progress_callback_sees_each_page() {
    let log = EventLog::default();
    let store = Arc::new(RecordingStore::new(&log));
    let cb = Arc::new(RecordingCallback::default());
    let config = IngestConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let ing = ingestor(ScriptedRenderer::new(2, &log), store, config);

    ing.ingest(PDF.to_vec()).await.unwrap();

    assert_eq!(
        *cb.events.lock().unwrap(),
        vec![
            "start:2",
            "uploaded:1",
            "uploaded:2",
            "complete:cover + 1 page uploaded"
        ]
    );
}

#[tokio::test]
async fn progress_callback_sees_failed_cleanup() {
    let log = EventLog::default();
    let mut store = RecordingStore::new(&log);
    store.fail_upload_page = Some(2);
    store.fail_delete = true;
    let store = Arc::new(store);
    let cb = Arc::new(RecordingCallback::default());
    let config = IngestConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let ing = ingestor(ScriptedRenderer::new(3, &log), store.clone(), config);

    let err = ing.ingest(PDF.to_vec()).await.unwrap_err();

    // The upload failure, not the cleanup failure, is what the caller sees.
    assert!(matches!(err, IngestError::UploadFailed { page: 2, .. }));
    assert_eq!(
        *cb.events.lock().unwrap(),
        vec!["start:3", "uploaded:1", "failed", "cleanup:0:1"]
    );
    assert_eq!(store.inner.len(), 1);
}
