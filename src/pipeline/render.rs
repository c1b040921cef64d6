//! PDF rasterisation: parse a document and render pages to `DynamicImage`.
//!
//! ## Threading
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not safe
//! to drive from async tasks. Initialising and destroying the library is
//! process-global, so the bindings are created once per process by
//! [`shared_pdfium`] and never dropped; jobs share them.
//!
//! A loaded `PdfDocument` borrows the bindings and cannot be handed between
//! blocking tasks page by page. [`PdfiumRenderer::open`] spawns one OS thread
//! per job that owns the document, and the async side talks to it over
//! channels: one request per page, one reply per request. Dropping the
//! [`RenderSession`] closes the request channel and the thread exits.
//!
//! The traits exist so the pipeline can be exercised without pdfium.

use crate::config::RENDER_SCALE;
use crate::error::IngestError;
use async_trait::async_trait;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Parses PDF documents into render sessions.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Parse `pdf` and return a session that renders its pages.
    ///
    /// Fails with [`IngestError::InvalidDocument`] if the bytes cannot be parsed.
    async fn open(&self, pdf: Vec<u8>) -> Result<Box<dyn RenderSession>, IngestError>;
}

/// An open document.
#[async_trait]
pub trait RenderSession: Send {
    /// Number of pages, fixed for the lifetime of the session.
    fn page_count(&self) -> usize;

    /// Rasterise 1-indexed `page_number` at [`RENDER_SCALE`].
    async fn render_page(&mut self, page_number: usize) -> Result<DynamicImage, IngestError>;
}

/// Document-level information returned by [`crate::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: String,
}

/// [`PdfRenderer`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumRenderer {
    pub fn new(library_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            library_path,
            password,
        }
    }

    /// Read document metadata without rendering anything.
    pub async fn inspect(&self, pdf: Vec<u8>) -> Result<DocumentInfo, IngestError> {
        let library_path = self.library_path.clone();
        let password = self.password.clone();
        tokio::task::spawn_blocking(move || {
            inspect_blocking(library_path.as_deref(), pdf, password.as_deref())
        })
        .await
        .map_err(|e| IngestError::Internal(format!("Inspect task panicked: {e}")))?
    }
}

#[async_trait]
impl PdfRenderer for PdfiumRenderer {
    async fn open(&self, pdf: Vec<u8>) -> Result<Box<dyn RenderSession>, IngestError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (request_tx, request_rx) = mpsc::channel(1);
        let library_path = self.library_path.clone();
        let password = self.password.clone();

        std::thread::Builder::new()
            .name("pdf-render".into())
            .spawn(move || {
                render_worker(library_path, pdf, password, ready_tx, request_rx);
            })
            .map_err(|e| IngestError::Internal(format!("Failed to spawn render thread: {e}")))?;

        let page_count = ready_rx
            .await
            .map_err(|_| IngestError::Internal("Render thread exited during load".into()))??;

        Ok(Box::new(PdfiumSession {
            page_count,
            requests: request_tx,
        }))
    }
}

struct RenderRequest {
    page_number: usize,
    reply: oneshot::Sender<Result<DynamicImage, IngestError>>,
}

struct PdfiumSession {
    page_count: usize,
    requests: mpsc::Sender<RenderRequest>,
}

#[async_trait]
impl RenderSession for PdfiumSession {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn render_page(&mut self, page_number: usize) -> Result<DynamicImage, IngestError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(RenderRequest { page_number, reply })
            .await
            .map_err(|_| IngestError::RenderFailed {
                page: page_number,
                detail: "render thread is gone".into(),
            })?;

        response.await.map_err(|_| IngestError::RenderFailed {
            page: page_number,
            detail: "render thread exited mid-page".into(),
        })?
    }
}

/// Body of the per-job render thread.
fn render_worker(
    library_path: Option<PathBuf>,
    pdf: Vec<u8>,
    password: Option<String>,
    ready: oneshot::Sender<Result<usize, IngestError>>,
    mut requests: mpsc::Receiver<RenderRequest>,
) {
    let pdfium = match shared_pdfium(library_path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let document = match pdfium.load_pdf_from_byte_vec(pdf, password.as_deref()) {
        Ok(doc) => doc,
        Err(e) => {
            let _ = ready.send(Err(IngestError::InvalidDocument {
                detail: format!("{e:?}"),
            }));
            return;
        }
    };

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);
    if ready.send(Ok(total_pages)).is_err() {
        return;
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE);

    while let Some(request) = requests.blocking_recv() {
        let result = render_one(pages, request.page_number, total_pages, &render_config);
        let _ = request.reply.send(result);
    }
    debug!("Render session closed");
}

fn render_one(
    pages: &PdfPages,
    page_number: usize,
    total_pages: usize,
    render_config: &PdfRenderConfig,
) -> Result<DynamicImage, IngestError> {
    if page_number == 0 || page_number > total_pages {
        return Err(IngestError::RenderFailed {
            page: page_number,
            detail: format!("page out of range (document has {total_pages} pages)"),
        });
    }

    let page = pages
        .get((page_number - 1) as u16)
        .map_err(|e| IngestError::RenderFailed {
            page: page_number,
            detail: format!("{e:?}"),
        })?;

    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| IngestError::RenderFailed {
            page: page_number,
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );
    Ok(image)
}

fn inspect_blocking(
    library_path: Option<&Path>,
    pdf: Vec<u8>,
    password: Option<&str>,
) -> Result<DocumentInfo, IngestError> {
    let pdfium = shared_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_vec(pdf, password)
        .map_err(|e| IngestError::InvalidDocument {
            detail: format!("{e:?}"),
        })?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentInfo {
        page_count: document.pages().len() as usize,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        pdf_version: format!("{:?}", document.version()),
    })
}

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// The process-wide pdfium bindings, bound on first use.
///
/// The first successful call decides which library is loaded; `library_path`
/// is ignored afterwards. A failed bind is not cached, so a later call may
/// retry with another path.
pub fn shared_pdfium(library_path: Option<&Path>) -> Result<&'static Pdfium, IngestError> {
    if let (Some(path), Some(_)) = (library_path, PDFIUM.get()) {
        debug!("pdfium already bound, ignoring {}", path.display());
    }
    PDFIUM.get_or_try_init(|| bind_pdfium(library_path))
}

/// Bind to a pdfium shared library.
///
/// Resolution order: explicit path, `PDFIUM_LIB_PATH`, the working
/// directory, the system library search path.
fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, IngestError> {
    if let Some(path) = library_path {
        return bind_from_path(path);
    }

    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        if !env_path.is_empty() {
            return bind_from_path(Path::new(&env_path));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| IngestError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

fn bind_from_path(path: &Path) -> Result<Pdfium, IngestError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| IngestError::PdfiumBindingFailed(format!("{}: {}", path.display(), e)))
}
