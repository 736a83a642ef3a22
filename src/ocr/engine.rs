//! Fault-tolerant extraction engine: one page in, one [`OcrResult`] out.
//!
//! The engine owns the full attempt lifecycle for a page: read the image,
//! invoke the recognizer, parse and normalise the output, and retry transient
//! failures with exponential backoff. Its one hard guarantee is that
//! [`OcrEngine::extract`] never returns `Err` — a page that cannot be
//! extracted after every retry yields a result with a populated `error`
//! field, and the batch carries on.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::ProcessConfig;
use crate::error::{OcrFailure, PdfOcrError};
use crate::prompts;
use crate::retry::RetryPolicy;

use super::normalize::{self, ParseFailureKind, CONFIDENCE_PARSE_FAILED, CONFIDENCE_UNPARSED};
use super::recognizer::{ModelCatalog, Recognizer};
use super::result::{OcrResult, PageImage};

/// Extraction engine for a single resolved model, shared across all pages of
/// a run.
pub struct OcrEngine<R> {
    recognizer: R,
    model: String,
    prompt: String,
    timeout: Duration,
    retry: RetryPolicy,
}

// Manual impl: the recognizer is a backend handle with no useful Debug
// output and may not implement Debug at all.
impl<R> std::fmt::Debug for OcrEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEngine")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<R: Recognizer> OcrEngine<R> {
    /// Build an engine, resolving the configured model against the catalog.
    ///
    /// Model resolution happens here, before any page is attempted: a missing
    /// requested model is substituted with the first available one, an empty
    /// catalog fails the whole run up front.
    pub fn new(
        recognizer: R,
        catalog: &ModelCatalog,
        config: &ProcessConfig,
    ) -> Result<Self, PdfOcrError> {
        let model = catalog.resolve(config.model.as_deref())?;
        Ok(Self {
            recognizer,
            model,
            prompt: prompts::extraction_prompt(&config.language_hint),
            timeout: Duration::from_secs(config.ocr_timeout_secs),
            retry: config.retry.clone(),
        })
    }

    /// The model actually in use, after any substitution.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The backing recognizer.
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Extract text from one page image.
    ///
    /// Infallible by contract: retry exhaustion and unreadable images produce
    /// an error-flagged [`OcrResult`], never an `Err`. The result's metadata
    /// records the attempt count and whether the output was degraded to
    /// plain text.
    #[instrument(skip(self, page), fields(page = page.index))]
    pub async fn extract(&self, page: &PageImage) -> OcrResult {
        let image = match tokio::fs::read(&page.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %page.path.display(), "page image unreadable: {e}");
                return OcrResult::failed(
                    &self.model,
                    OcrFailure::ImageMissing {
                        path: page.path.clone(),
                        detail: e.to_string(),
                    },
                );
            }
        };

        let max_attempts = self.retry.max_retries + 1;
        let mut last_failure: Option<OcrFailure> = None;
        // Raw output of the most recent attempt, kept only while that
        // attempt's failure was a parse failure: it is the text we degrade
        // to when structured retries run out.
        let mut salvage: Option<(String, f64)> = None;

        for attempt in 1..=max_attempts {
            match self
                .recognizer
                .recognize(&self.model, &self.prompt, &image, self.timeout)
                .await
            {
                Ok(raw) => match normalize::parse_attempt(&raw) {
                    Ok(value) => {
                        let mut result =
                            normalize::normalize_parsed(&value, page.width, page.height);
                        result.model = self.model.clone();
                        result.metadata.insert("attempts".into(), json!(attempt));
                        debug!(attempt, confidence = result.confidence, "extraction succeeded");
                        return result;
                    }
                    Err(kind) => {
                        let (confidence, detail) = match &kind {
                            ParseFailureKind::NoJsonFound => {
                                (CONFIDENCE_UNPARSED, "no JSON object in output".to_string())
                            }
                            ParseFailureKind::InvalidJson(e) => (CONFIDENCE_PARSE_FAILED, e.clone()),
                        };
                        salvage = Some((raw, confidence));
                        last_failure = Some(OcrFailure::MalformedOutput { detail });
                    }
                },
                Err(failure) => {
                    salvage = None;
                    last_failure = Some(failure);
                }
            }

            // last_failure is always set on this path.
            let kind = match &last_failure {
                Some(f) => f.kind(),
                None => break,
            };
            if attempt < max_attempts && self.retry.is_retryable(kind) {
                let delay = self.retry.delay_for(attempt);
                debug!(attempt, ?kind, ?delay, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            } else {
                return self.exhausted(page, attempt, last_failure, salvage);
            }
        }

        self.exhausted(page, max_attempts, last_failure, salvage)
    }

    /// Build the final result once no retries remain.
    ///
    /// When the last attempt produced output that merely failed to parse,
    /// the raw text is kept as a degraded plain-text result rather than
    /// discarded; process-level failures yield an error-flagged result.
    fn exhausted(
        &self,
        page: &PageImage,
        attempts: u32,
        last_failure: Option<OcrFailure>,
        salvage: Option<(String, f64)>,
    ) -> OcrResult {
        if let Some((raw, confidence)) = salvage {
            warn!(
                page = page.index,
                attempts, confidence, "structured parse exhausted, degrading to plain text"
            );
            let mut result =
                normalize::plain_text_result(&raw, confidence, page.width, page.height);
            result.model = self.model.clone();
            result.metadata.insert("attempts".into(), json!(attempts));
            result.metadata.insert("degraded".into(), json!(true));
            return result;
        }

        let failure = last_failure.unwrap_or(OcrFailure::ValidationError {
            detail: "extraction produced no attempts".to_string(),
        });
        warn!(page = page.index, attempts, %failure, "extraction exhausted");
        let mut result = OcrResult::failed(&self.model, failure);
        result.metadata.insert("attempts".into(), json!(attempts));
        result
    }
}
