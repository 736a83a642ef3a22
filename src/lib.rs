//! # pdfocr
//!
//! Turn PDF pages into searchable SVG overlays using local vision models.
//!
//! ## Why this crate?
//!
//! Scanned PDFs carry no selectable text, and classical OCR engines struggle
//! with handwriting, stamps and mixed-language pages. This crate rasterises
//! each page, asks a locally-installed vision model (via Ollama) to read it,
//! and composes everything into one self-contained SVG: the page images with
//! an invisible-but-searchable text layer positioned on top. Nothing leaves
//! the machine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Enhance   optional grayscale / contrast / threshold / sharpen pass
//!  ├─ 4. Extract   concurrent `ollama run` subprocesses, retry + degrade
//!  ├─ 5. Layout    scroll or grid canvas geometry
//!  └─ 6. Compose   SVG with image, overlay text, search layer, navigation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfocr::{process_pdf, ProcessConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Uses the first vision model found in `ollama list`.
//!     let config = ProcessConfig::default();
//!     let output = process_pdf("document.pdf", Path::new("out"), &config).await?;
//!     println!("{}", output.svg_path.display());
//!     eprintln!(
//!         "pages: {}/{} (avg confidence {:.2})",
//!         output.report.pages_processed,
//!         output.report.total_pages,
//!         output.report.average_confidence,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfocr` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfocr = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! Failures resolve at the smallest possible scope: a malformed text block is
//! dropped, not its page; an exhausted page carries an error in its result,
//! not an `Err`; a failed file is recorded in the batch report and the rest
//! of the batch continues. Only environment-level problems (no input, no
//! model installed, corrupt PDF) abort a run.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compositor;
pub mod config;
pub mod error;
pub mod layout;
pub mod ocr;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod retry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compositor::SvgCompositor;
pub use config::{DisplayMode, ProcessConfig, ProcessConfigBuilder};
pub use error::{FailureKind, OcrFailure, PdfOcrError};
pub use layout::{CanvasLayout, PageGeometry};
pub use ocr::{ModelCatalog, OcrEngine, OcrResult, OllamaRecognizer, PageImage, Recognizer, TextBlock};
pub use output::{BatchReport, DocumentOutput, FileReport, ReportStatus};
pub use pipeline::enhance::EnhanceStrategy;
pub use process::{process_batch, process_pdf, process_pdf_with};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use retry::RetryPolicy;
