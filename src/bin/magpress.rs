//! CLI binary for magpress.
//!
//! A thin shim over the library crate that maps CLI flags to an
//! `IngestConfig` plus a blob-store backend and prints the resulting URLs.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use magpress::{
    inspect, BlobStore, IngestConfig, IngestOutput, IngestProgressCallback, Ingestor,
    LocalBlobStore, MemoryBlobStore, ProgressCallback, RestBlobStore,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while the PDF is parsed, then a bar that
/// advances once per uploaded page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Processing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_ingest_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Uploading");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_uploaded(&self, page_num: usize, total_pages: usize, url: &str) {
        let label = if page_num == 1 { "cover" } else { "page " };
        self.bar.println(format!(
            "  {} {} {:>3}/{:<3}  {}",
            green("✓"),
            label,
            page_num,
            total_pages,
            dim(url)
        ));
        self.bar.inc(1);
    }

    fn on_ingest_complete(&self, _total_pages: usize, summary: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", green("✔"), bold(summary));
    }

    fn on_ingest_failed(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(error));
    }

    fn on_cleanup(&self, removed: usize, leftover: usize) {
        if leftover == 0 {
            eprintln!("  {}", dim(&format!("removed {removed} partial upload(s)")));
        } else {
            eprintln!(
                "  {}",
                red(&format!("{leftover} partial upload(s) could not be removed"))
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload an issue to the hosted backend's "magazines" bucket
  magpress spring-issue.pdf --endpoint https://xyz.example.co --api-key $KEY

  # Write images to a local folder served at http://localhost:8080/magazines
  magpress spring-issue.pdf --backend local --root ./public/magazines \
      --public-base-url http://localhost:8080/magazines

  # Dry run: render and "upload" to memory only
  magpress spring-issue.pdf --backend memory --json

  # Page count and metadata, nothing uploaded
  magpress --inspect-only spring-issue.pdf

ENVIRONMENT VARIABLES:
  MAGPRESS_ENDPOINT        Backend project URL (rest backend)
  MAGPRESS_API_KEY         Backend API key (rest backend)
  MAGPRESS_BUCKET          Storage bucket (default: magazines)
  MAGPRESS_ROOT            Output directory (local backend)
  MAGPRESS_PUBLIC_BASE_URL Public URL of the output directory (local backend)
  PDFIUM_LIB_PATH          Path to libpdfium
  RUST_LOG                 Log filter, overrides --verbose/--quiet
"#;

/// Convert a magazine PDF into hosted page images for the flipbook reader.
#[derive(Parser, Debug)]
#[command(
    name = "magpress",
    version,
    about = "Convert a magazine PDF into hosted page images",
    long_about = "Render every page of a magazine PDF to JPEG, upload page 1 as the cover \
and the rest as pages, and print the resulting public URLs in reading order.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Where page images are stored.
    #[arg(long, env = "MAGPRESS_BACKEND", value_enum, default_value = "rest")]
    backend: BackendArg,

    /// Backend project URL (rest backend).
    #[arg(long, env = "MAGPRESS_ENDPOINT")]
    endpoint: Option<String>,

    /// Backend API key (rest backend).
    #[arg(long, env = "MAGPRESS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Storage bucket (rest backend).
    #[arg(long, env = "MAGPRESS_BUCKET", default_value = "magazines")]
    bucket: String,

    /// Output directory (local backend).
    #[arg(long, env = "MAGPRESS_ROOT")]
    root: Option<PathBuf>,

    /// Public URL under which the output directory is served (local and memory backends).
    #[arg(long, env = "MAGPRESS_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Storage request timeout in seconds.
    #[arg(long, env = "MAGPRESS_UPLOAD_TIMEOUT", default_value_t = 60)]
    upload_timeout: u64,

    /// Folder for the cover image.
    #[arg(long, env = "MAGPRESS_COVERS_PREFIX", default_value = "covers")]
    covers_prefix: String,

    /// Folder for pages 2..N.
    #[arg(long, env = "MAGPRESS_PAGES_PREFIX", default_value = "pages")]
    pages_prefix: String,

    /// Keep already-uploaded pages when a later page fails.
    #[arg(long, env = "MAGPRESS_KEEP_ORPHANS")]
    keep_orphans: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "MAGPRESS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "MAGPRESS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print page count and metadata only; upload nothing.
    #[arg(long)]
    inspect_only: bool,

    /// Print structured JSON instead of one URL per line.
    #[arg(long, env = "MAGPRESS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MAGPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MAGPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MAGPRESS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Rest,
    Local,
    Memory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn IngestProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = info.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Run ingestion ────────────────────────────────────────────────────
    let store = build_store(&cli)?;
    let ingestor = Ingestor::with_pdfium(store, config);
    let output = ingestor
        .ingest_source(&cli.input)
        .await
        .context("Ingestion failed")?;

    print_output(&output, cli.json)?;

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "{}  {}ms total",
            output.summary(),
            output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `IngestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestConfig> {
    let mut builder = IngestConfig::builder()
        .covers_prefix(cli.covers_prefix.clone())
        .pages_prefix(cli.pages_prefix.clone())
        .cleanup_on_failure(!cli.keep_orphans)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.pdfium {
        builder = builder.pdfium_library_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Construct the selected blob-store backend.
fn build_store(cli: &Cli) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match cli.backend {
        BackendArg::Rest => {
            let endpoint = cli
                .endpoint
                .clone()
                .context("--endpoint (or MAGPRESS_ENDPOINT) is required for the rest backend")?;
            let api_key = cli
                .api_key
                .clone()
                .context("--api-key (or MAGPRESS_API_KEY) is required for the rest backend")?;
            Arc::new(
                RestBlobStore::new(
                    endpoint,
                    cli.bucket.clone(),
                    api_key,
                    Duration::from_secs(cli.upload_timeout),
                )
                .context("Failed to create storage client")?,
            )
        }
        BackendArg::Local => {
            let root = cli
                .root
                .clone()
                .context("--root (or MAGPRESS_ROOT) is required for the local backend")?;
            let base = cli.public_base_url.clone().unwrap_or_else(|| {
                format!("file://{}", root.display())
            });
            Arc::new(LocalBlobStore::new(root, base))
        }
        BackendArg::Memory => match cli.public_base_url {
            Some(ref base) => Arc::new(MemoryBlobStore::new(base.clone())),
            None => Arc::new(MemoryBlobStore::default()),
        },
    };
    Ok(store)
}

fn print_output(output: &IngestOutput, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        for url in output.all_urls() {
            println!("{url}");
        }
    }
    Ok(())
}
