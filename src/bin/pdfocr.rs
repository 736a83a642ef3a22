//! CLI binary for pdfocr.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ProcessConfig` and prints run summaries.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfocr::{
    process, DisplayMode, EnhanceStrategy, ModelCatalog, OcrEngine, OllamaRecognizer,
    ProcessConfig, ProcessingProgressCallback, ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one live bar plus per-page log lines.
/// Pages complete out of order under concurrency, so everything is
/// position-independent.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Bar length is set by `on_batch_start` once the page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ProcessingProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting text from {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, confidence: f64) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("confidence {confidence:.2}")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            let mut truncated: String = error.chars().take(79).collect();
            truncated.push('\u{2026}');
            truncated
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic processing (writes document.svg into ./out)
  pdfocr document.pdf

  # Choose model, output directory and worker count
  pdfocr --model llava:7b --workers 2 -o results scan.pdf

  # Grid layout, three columns, keep the rendered page images
  pdfocr --mode grid --columns 3 --save-images atlas.pdf

  # Process a scanned fax with preprocessing and a longer timeout
  pdfocr --enhance contrast-stretch --timeout 600 fax.pdf

  # Translation overlays targeting English
  pdfocr --translate-to en brief_de.pdf

  # Several files in one run, with a JSON batch report
  pdfocr --report a.pdf b.pdf c.pdf

  # Process straight from a URL
  pdfocr https://example.com/minutes.pdf

SETUP:
  1. Install Ollama:        https://ollama.ai
  2. Pull a vision model:   ollama pull llava:7b
  3. Process:               pdfocr document.pdf

  Everything runs locally; no document data leaves the machine.
"#;

/// Turn PDF pages into searchable SVG overlays using local vision models.
#[derive(Parser, Debug)]
#[command(
    name = "pdfocr",
    version,
    about = "Turn PDF pages into searchable SVG overlays using local vision models",
    long_about = "Rasterise PDF pages, extract their text with a locally-installed vision model \
(via Ollama), and compose a self-contained SVG with the page images plus a positioned, \
searchable text layer. Works entirely offline.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory for the SVG and report artifacts.
    #[arg(short, long, env = "PDFOCR_OUTPUT", default_value = "out")]
    output: PathBuf,

    /// Vision model tag (e.g. llava:7b). Defaults to the first model in
    /// `ollama list`.
    #[arg(long, env = "PDFOCR_MODEL")]
    model: Option<String>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDFOCR_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of concurrent recognition subprocesses.
    #[arg(short, long, env = "PDFOCR_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Per-page recognition timeout in seconds.
    #[arg(long, env = "PDFOCR_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Retries per page on transient recognition failure.
    #[arg(long, env = "PDFOCR_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Expected document language (hint for the model).
    #[arg(long, env = "PDFOCR_LANGUAGE", default_value = "en")]
    language: String,

    /// Image preprocessing before recognition.
    #[arg(long, env = "PDFOCR_ENHANCE", value_enum, default_value = "original")]
    enhance: EnhanceStrategy,

    /// Page arrangement on the SVG canvas.
    #[arg(long, env = "PDFOCR_MODE", value_enum, default_value = "scroll")]
    mode: ModeArg,

    /// Column count in grid mode.
    #[arg(long, env = "PDFOCR_COLUMNS", default_value_t = 2)]
    columns: usize,

    /// Spacing between pages on the canvas, in pixels.
    #[arg(long, env = "PDFOCR_SPACING", default_value_t = 20)]
    spacing: u32,

    /// Add pass-through translation overlays targeting this language code.
    #[arg(long, env = "PDFOCR_TRANSLATE_TO")]
    translate_to: Option<String>,

    /// Disable hover highlighting of text blocks.
    #[arg(long, env = "PDFOCR_NO_HIGHLIGHTS")]
    no_highlights: bool,

    /// Keep the rendered page PNGs next to the SVG.
    #[arg(long, env = "PDFOCR_SAVE_IMAGES")]
    save_images: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFOCR_PASSWORD")]
    password: Option<String>,

    /// Write a JSON processing report next to the SVG.
    #[arg(long, env = "PDFOCR_REPORT")]
    report: bool,

    /// Print the report as JSON on stdout instead of a summary.
    #[arg(long, env = "PDFOCR_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFOCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFOCR_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFOCR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Scroll,
    Grid,
}

impl From<ModeArg> for DisplayMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Scroll => DisplayMode::Scroll,
            ModeArg::Grid => DisplayMode::Grid,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar is the user-facing feedback; suppress INFO-level
    // library logs while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress && cli.inputs.len() == 1 {
        Some(CliProgressCallback::new_dynamic() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Probe the model catalog once, run everything with one engine ─────
    let catalog = ModelCatalog::detect()
        .await
        .context("Recognition runtime unavailable")?;
    let engine = OcrEngine::new(OllamaRecognizer::new(), &catalog, &config)
        .context("No usable recognition model")?;

    let mut reports = Vec::with_capacity(cli.inputs.len());
    let mut any_fatal = false;
    for input in &cli.inputs {
        match process::process_pdf_with(&engine, input, &cli.output, &config).await {
            Ok(output) => {
                if !cli.quiet && !cli.json {
                    eprintln!(
                        "{}  {}/{} pages  avg confidence {:.2}  →  {}",
                        if output.report.pages_processed == output.report.total_pages {
                            green("✔")
                        } else {
                            cyan("⚠")
                        },
                        output.report.pages_processed,
                        output.report.total_pages,
                        output.report.average_confidence,
                        bold(&output.svg_path.display().to_string()),
                    );
                }
                reports.push(output.report);
            }
            Err(e) => {
                any_fatal = true;
                eprintln!("{} {input}: {e}", red("✘"));
            }
        }
    }

    // ── Reports ──────────────────────────────────────────────────────────
    if cli.report {
        for report in &reports {
            let stem = PathBuf::from(&report.input)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let path = process::report_path(&cli.output, &stem);
            process::write_report(&path, report)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            if !cli.quiet && !cli.json {
                eprintln!("   {}", dim(&path.display().to_string()));
            }
        }
    }

    if cli.json {
        let json = if reports.len() == 1 {
            serde_json::to_string_pretty(&reports[0])
        } else {
            serde_json::to_string_pretty(&pdfocr::BatchReport::new(reports.clone()))
        }
        .context("Failed to serialise report")?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes()).ok();
        stdout.write_all(b"\n").ok();
    }

    if any_fatal || reports.iter().all(|r| r.pages_processed == 0) {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `ProcessConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ProcessConfig> {
    let mut builder = ProcessConfig::builder()
        .dpi(cli.dpi)
        .workers(cli.workers)
        .ocr_timeout_secs(cli.timeout)
        .language_hint(&cli.language)
        .enhance(cli.enhance)
        .display_mode(cli.mode.into())
        .grid_columns(cli.columns)
        .page_spacing(cli.spacing)
        .show_highlights(!cli.no_highlights)
        .save_images(cli.save_images)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref lang) = cli.translate_to {
        builder = builder.translate_to(lang);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;
    config.retry.max_retries = cli.max_retries;
    Ok(config)
}
