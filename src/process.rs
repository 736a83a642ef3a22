//! Top-level entry points: one PDF (or a batch of them) in, SVG plus report
//! out.
//!
//! `process_pdf` wires the stages together: resolve the input, probe the
//! model catalog, rasterise, extract under bounded concurrency, lay out the
//! canvas, compose the SVG and summarise the run. `process_pages` is the
//! back half of that pipeline, public so callers that already hold rendered
//! page images (or a custom [`Recognizer`]) can reuse it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::compositor::SvgCompositor;
use crate::config::ProcessConfig;
use crate::error::PdfOcrError;
use crate::layout::CanvasLayout;
use crate::ocr::{ModelCatalog, OcrEngine, OllamaRecognizer, PageImage, Recognizer};
use crate::orchestrator;
use crate::output::{self, BatchReport, DocumentOutput, FileReport};
use crate::pipeline::{input, render};

/// Process one PDF end to end.
///
/// Fatal conditions (unreadable input, no models installed, corrupt PDF)
/// surface as `Err`; per-page extraction failures are folded into the
/// report and the returned results instead.
#[instrument(skip(config), fields(input = %input_str))]
pub async fn process_pdf(
    input_str: &str,
    output_dir: &Path,
    config: &ProcessConfig,
) -> Result<DocumentOutput, PdfOcrError> {
    let catalog = ModelCatalog::detect().await?;
    let engine = OcrEngine::new(OllamaRecognizer::new(), &catalog, config)?;
    process_pdf_with(&engine, input_str, output_dir, config).await
}

/// Like [`process_pdf`] but with a caller-supplied engine, so the model
/// catalog is probed once per batch rather than once per file.
pub async fn process_pdf_with<R: Recognizer>(
    engine: &OcrEngine<R>,
    input_str: &str,
    output_dir: &Path,
    config: &ProcessConfig,
) -> Result<DocumentOutput, PdfOcrError> {
    let started = Instant::now();

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let stem = file_stem(resolved.path());

    std::fs::create_dir_all(output_dir).map_err(|e| PdfOcrError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    // Rendered PNGs either live next to the SVG (kept as artifacts) or in a
    // temp dir that vanishes after composition.
    let (image_dir, _image_tmp) = if config.save_images {
        let dir = output_dir.join(format!("{stem}-pages"));
        std::fs::create_dir_all(&dir).map_err(|e| PdfOcrError::OutputWriteFailed {
            path: dir.clone(),
            source: e,
        })?;
        (dir, None)
    } else {
        let tmp = tempfile::tempdir().map_err(|e| PdfOcrError::Internal(e.to_string()))?;
        (tmp.path().to_path_buf(), Some(tmp))
    };

    let pages = render::render_pages(resolved.path(), config, &image_dir).await?;
    info!(pages = pages.len(), "rendered, starting extraction");

    process_pages(engine, &pages, input_str, &stem, output_dir, config, started).await
}

/// Extraction, layout, composition and reporting for already-rendered pages.
pub async fn process_pages<R: Recognizer>(
    engine: &OcrEngine<R>,
    pages: &[PageImage],
    input_str: &str,
    stem: &str,
    output_dir: &Path,
    config: &ProcessConfig,
    started: Instant,
) -> Result<DocumentOutput, PdfOcrError> {
    let results = orchestrator::run_batch(engine, pages, config).await;

    let layout = CanvasLayout::compute(
        pages,
        config.display_mode,
        config.grid_columns,
        config.page_spacing,
    );
    let svg = SvgCompositor::new(config).compose(pages, &results, &layout);

    let svg_path = output_dir.join(format!("{stem}.svg"));
    output::write_atomic(&svg_path, svg.as_bytes())?;
    info!(svg = %svg_path.display(), "composed document written");

    let mut report = FileReport::from_results(
        input_str,
        engine.model(),
        &results,
        started.elapsed().as_secs_f64(),
    );
    report.artifacts.push(svg_path.clone());
    if config.save_images {
        report.artifacts.extend(pages.iter().map(|p| p.path.clone()));
    }

    Ok(DocumentOutput {
        svg_path,
        results,
        report,
    })
}

/// Process several PDFs sequentially with one shared engine.
///
/// A file that fails fatally is recorded in the batch report and the
/// remaining files still run; only environment-level failures (no models
/// installed) abort the whole batch.
pub async fn process_batch(
    inputs: &[String],
    output_dir: &Path,
    config: &ProcessConfig,
) -> Result<BatchReport, PdfOcrError> {
    let catalog = ModelCatalog::detect().await?;
    let engine = OcrEngine::new(OllamaRecognizer::new(), &catalog, config)?;

    let mut files = Vec::with_capacity(inputs.len());
    for input_str in inputs {
        match process_pdf_with(&engine, input_str, output_dir, config).await {
            Ok(output) => files.push(output.report),
            Err(e) => {
                warn!(input = %input_str, "file failed: {e}");
                let mut report = FileReport::from_results(input_str.clone(), engine.model(), &[], 0.0);
                report.errors.push(e.to_string());
                files.push(report);
            }
        }
    }

    Ok(BatchReport::new(files))
}

/// Write a report as pretty JSON next to the other artifacts.
pub fn write_report<T: serde::Serialize>(path: &Path, report: &T) -> Result<(), PdfOcrError> {
    let json = serde_json::to_vec_pretty(report)
        .map_err(|e| PdfOcrError::Internal(format!("report serialisation failed: {e}")))?;
    output::write_atomic(path, &json)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Default report path for an input stem.
pub fn report_path(output_dir: &Path, stem: &str) -> PathBuf {
    output_dir.join(format!("{stem}.report.json"))
}
