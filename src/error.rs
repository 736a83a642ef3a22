//! Error types for the pdfocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfOcrError`] — **Fatal**: processing cannot proceed at all (bad input
//!   file, wrong password, no recognition model installed). Returned as
//!   `Err(PdfOcrError)` from the top-level `process*` functions.
//!
//! * [`OcrFailure`] — **Non-fatal**: a single extraction attempt or page went
//!   wrong (subprocess timeout, unparseable model output). Resolved at the
//!   smallest possible scope: a bad block never fails a page, a failed page
//!   never fails a batch, a failed file never stops the remaining files.
//!   Exhausted failures end up in [`crate::ocr::OcrResult::error`], never as
//!   a propagated `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfocr library.
///
/// Page-level failures use [`OcrFailure`] and are stored in
/// [`crate::ocr::OcrResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PdfOcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The PDF produced no page images at all.
    #[error("No pages could be rendered from '{path}'")]
    NoPagesRendered { path: PathBuf },

    // ── Recognition errors ────────────────────────────────────────────────
    /// The recognition runtime (ollama) is missing or not responding.
    #[error("Recognition runtime unavailable: {detail}\nInstall Ollama from https://ollama.ai and pull a vision model (e.g. `ollama pull llava:7b`).")]
    RuntimeUnavailable { detail: String },

    /// No vision model is installed, so no extraction can run at all.
    #[error("No recognition models installed.\nPull one with: ollama pull llava:7b")]
    NoModelsAvailable,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`OcrFailure`].
///
/// [`crate::retry::RetryPolicy`] keys its retryable-set on this, so it must
/// stay cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Requested model is not installed (substituted or fatal, never retried).
    ModelUnavailable,
    /// Source page image is missing or unreadable (fatal for that page only).
    ImageMissing,
    /// Recognition subprocess exceeded its deadline.
    ProcessTimeout,
    /// Recognition subprocess exited non-zero.
    ProcessFailure,
    /// Output contained no parseable JSON object.
    MalformedOutput,
    /// A parsed field failed normalisation (block dropped, not the page).
    ValidationError,
}

/// A non-fatal failure for a single extraction attempt or page.
///
/// Carries enough diagnostic detail to explain a failed page in the batch
/// report without re-running.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum OcrFailure {
    /// Requested model absent from the catalog.
    #[error("model '{requested}' is not installed (available: {available:?})")]
    ModelUnavailable {
        requested: String,
        available: Vec<String>,
    },

    /// Source image could not be read.
    #[error("page image missing or unreadable: {path}: {detail}")]
    ImageMissing { path: PathBuf, detail: String },

    /// Subprocess hit the hard timeout.
    #[error("recognition timed out after {secs}s")]
    ProcessTimeout { secs: u64 },

    /// Subprocess exited with a non-zero status.
    #[error("recognition process failed (exit code {code:?}): {stderr}")]
    ProcessFailure { code: Option<i32>, stderr: String },

    /// No JSON object could be recovered from the output stream.
    #[error("model output contained no parseable JSON: {detail}")]
    MalformedOutput { detail: String },

    /// A field failed normalisation.
    #[error("validation failed: {detail}")]
    ValidationError { detail: String },
}

impl OcrFailure {
    /// The coarse kind used for retry-policy membership tests.
    pub fn kind(&self) -> FailureKind {
        match self {
            OcrFailure::ModelUnavailable { .. } => FailureKind::ModelUnavailable,
            OcrFailure::ImageMissing { .. } => FailureKind::ImageMissing,
            OcrFailure::ProcessTimeout { .. } => FailureKind::ProcessTimeout,
            OcrFailure::ProcessFailure { .. } => FailureKind::ProcessFailure,
            OcrFailure::MalformedOutput { .. } => FailureKind::MalformedOutput,
            OcrFailure::ValidationError { .. } => FailureKind::ValidationError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_roundtrip() {
        let f = OcrFailure::ProcessTimeout { secs: 300 };
        assert_eq!(f.kind(), FailureKind::ProcessTimeout);
        assert!(f.to_string().contains("300s"));
    }

    #[test]
    fn process_failure_display() {
        let f = OcrFailure::ProcessFailure {
            code: Some(1),
            stderr: "model crashed".into(),
        };
        let msg = f.to_string();
        assert!(msg.contains("model crashed"), "got: {msg}");
    }

    #[test]
    fn model_unavailable_lists_alternatives() {
        let f = OcrFailure::ModelUnavailable {
            requested: "llava:34b".into(),
            available: vec!["llava:7b".into()],
        };
        assert!(f.to_string().contains("llava:34b"));
        assert!(f.to_string().contains("llava:7b"));
    }

    #[test]
    fn no_models_display() {
        let e = PdfOcrError::NoModelsAvailable;
        assert!(e.to_string().contains("ollama pull"));
    }
}
