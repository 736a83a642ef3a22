//! Output artifacts: the per-file processing report and atomic file writes.
//!
//! Reports are the machine-readable record of a run — which pages made it,
//! at what confidence, and why the others failed — serialised as JSON next
//! to the SVG. All artifact writes go through [`write_atomic`] so a crash
//! mid-write never leaves a truncated SVG or report behind.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PdfOcrError;
use crate::ocr::OcrResult;

/// Outcome of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// At least one page produced usable text.
    Completed,
    /// Every page failed.
    Failed,
}

/// Per-page entry in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-based page number.
    pub page: usize,
    pub confidence: f64,
    pub block_count: usize,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Processing report for one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub input: String,
    pub status: ReportStatus,
    pub model: String,
    /// Pages that produced usable text.
    pub pages_processed: usize,
    pub total_pages: usize,
    /// Mean confidence over successful pages, 0 when none succeeded.
    pub average_confidence: f64,
    pub processing_time_secs: f64,
    /// Files written for this input: the SVG, saved page images, the report.
    pub artifacts: Vec<PathBuf>,
    /// Human-readable descriptions of per-page failures.
    pub errors: Vec<String>,
    pub pages: Vec<PageSummary>,
}

impl FileReport {
    /// Summarise a finished run over its page results.
    pub fn from_results(
        input: impl Into<String>,
        model: impl Into<String>,
        results: &[OcrResult],
        processing_time_secs: f64,
    ) -> Self {
        let total_pages = results.len();
        let successes: Vec<&OcrResult> = results.iter().filter(|r| r.is_success()).collect();
        let pages_processed = successes.len();

        let average_confidence = if successes.is_empty() {
            0.0
        } else {
            successes.iter().map(|r| r.confidence).sum::<f64>() / successes.len() as f64
        };

        let errors = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                r.error
                    .as_ref()
                    .map(|e| format!("page {}: {e}", i + 1))
            })
            .collect();

        let pages = results
            .iter()
            .enumerate()
            .map(|(i, r)| PageSummary {
                page: i + 1,
                confidence: r.confidence,
                block_count: r.blocks.len(),
                language: r.language.clone(),
                error: r.error.as_ref().map(|e| e.to_string()),
            })
            .collect();

        Self {
            input: input.into(),
            status: if pages_processed > 0 {
                ReportStatus::Completed
            } else {
                ReportStatus::Failed
            },
            model: model.into(),
            pages_processed,
            total_pages,
            average_confidence,
            processing_time_secs,
            artifacts: Vec::new(),
            errors,
            pages,
        }
    }
}

/// Report covering a whole batch invocation (one entry per input file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub files_completed: usize,
    pub files_failed: usize,
    pub total_pages_processed: usize,
}

impl BatchReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        let files_completed = files
            .iter()
            .filter(|f| f.status == ReportStatus::Completed)
            .count();
        let files_failed = files.len() - files_completed;
        let total_pages_processed = files.iter().map(|f| f.pages_processed).sum();
        Self {
            files,
            files_completed,
            files_failed,
            total_pages_processed,
        }
    }
}

/// Everything produced for one input file.
#[derive(Debug)]
pub struct DocumentOutput {
    /// Path of the composed SVG.
    pub svg_path: PathBuf,
    /// Per-page extraction results in document order.
    pub results: Vec<OcrResult>,
    /// The run report (also written to disk when requested).
    pub report: FileReport,
}

/// Write `contents` to `path` via a temp file in the same directory plus
/// rename, so readers only ever see the previous version or the complete
/// new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PdfOcrError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| PdfOcrError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tmp.write_all(contents)
        .map_err(|e| PdfOcrError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tmp.persist(path)
        .map_err(|e| PdfOcrError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrFailure;

    fn success(confidence: f64) -> OcrResult {
        OcrResult {
            text: "t".into(),
            confidence,
            language: "en".into(),
            model: "llava:7b".into(),
            ..OcrResult::default()
        }
    }

    #[test]
    fn report_counts_and_averages_successes_only() {
        let results = vec![
            success(0.9),
            OcrResult::failed("llava:7b", OcrFailure::ProcessTimeout { secs: 300 }),
            success(0.7),
        ];
        let report = FileReport::from_results("doc.pdf", "llava:7b", &results, 12.5);

        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.pages_processed, 2);
        assert_eq!(report.total_pages, 3);
        assert!((report.average_confidence - 0.8).abs() < 1e-9);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("page 2:"));
        assert_eq!(report.pages.len(), 3);
        assert!(report.pages[1].error.is_some());
    }

    #[test]
    fn all_failed_pages_mark_the_file_failed() {
        let results = vec![OcrResult::failed(
            "llava:7b",
            OcrFailure::ProcessFailure {
                code: Some(1),
                stderr: "crash".into(),
            },
        )];
        let report = FileReport::from_results("doc.pdf", "llava:7b", &results, 1.0);
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.average_confidence, 0.0);
    }

    #[test]
    fn report_serialises_with_lowercase_status() {
        let report = FileReport::from_results("doc.pdf", "llava:7b", &[success(1.0)], 0.5);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"completed\""));
        assert!(json.contains("\"pages_processed\":1"));
    }

    #[test]
    fn batch_report_tallies_files() {
        let ok = FileReport::from_results("a.pdf", "m", &[success(0.9)], 1.0);
        let bad = FileReport::from_results(
            "b.pdf",
            "m",
            &[OcrResult::failed(
                "m",
                OcrFailure::ProcessTimeout { secs: 1 },
            )],
            1.0,
        );
        let batch = BatchReport::new(vec![ok, bad]);
        assert_eq!(batch.files_completed, 1);
        assert_eq!(batch.files_failed, 1);
        assert_eq!(batch.total_pages_processed, 1);
    }

    #[test]
    fn atomic_write_replaces_contents_completely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second version").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second version");
    }
}
