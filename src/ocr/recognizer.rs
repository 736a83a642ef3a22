//! Recognition backends and the local model catalog.
//!
//! The default backend shells out to a local `ollama` runtime: one subprocess
//! per page attempt, image bytes on stdin, model output on stdout. The
//! [`Recognizer`] trait is the seam that keeps the extraction engine testable
//! without a multi-gigabyte vision model installed.

use futures::future::BoxFuture;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{OcrFailure, PdfOcrError};

/// A text-recognition backend: image bytes + prompt in, raw model output out.
///
/// One call corresponds to one attempt on one page. Implementations must be
/// cheap to share (`&self`) across concurrent jobs.
pub trait Recognizer: Send + Sync {
    /// Run one recognition attempt and return the model's raw stdout.
    ///
    /// The `Err` side carries the attempt-level failure; classifying it as
    /// retryable or fatal is the engine's job, not the backend's.
    fn recognize<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
        image_bytes: &'a [u8],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, OcrFailure>>;
}

/// Recognizer backed by a local `ollama run` subprocess.
#[derive(Debug, Clone, Default)]
pub struct OllamaRecognizer {
    /// Binary to invoke; override for sandboxed or test environments.
    program: Option<String>,
}

impl OllamaRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom binary instead of `ollama` on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> &str {
        self.program.as_deref().unwrap_or("ollama")
    }
}

impl Recognizer for OllamaRecognizer {
    fn recognize<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
        image_bytes: &'a [u8],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String, OcrFailure>> {
        Box::pin(async move {
            debug!(model, image_len = image_bytes.len(), "spawning recognition subprocess");

            let mut child = Command::new(self.program())
                .arg("run")
                .arg(model)
                .arg(prompt)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                // Timed-out children must not outlive their attempt.
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| OcrFailure::ProcessFailure {
                    code: None,
                    stderr: format!("failed to spawn {}: {e}", self.program()),
                })?;

            // The stdin write sits inside the timeout region: a child that
            // never reads its pipe would otherwise block the worker for its
            // whole lifetime once the pipe buffer fills. On expiry the
            // future is dropped and kill_on_drop reaps the child.
            let stdin = child.stdin.take();
            let interaction = async move {
                if let Some(mut stdin) = stdin {
                    // A closed pipe here means the child already exited; let
                    // wait_with_output surface its stderr instead.
                    if let Err(e) = stdin.write_all(image_bytes).await {
                        warn!("writing image to subprocess stdin failed: {e}");
                    }
                    drop(stdin);
                }
                child.wait_with_output().await
            };

            let output = match tokio::time::timeout(timeout, interaction).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Err(OcrFailure::ProcessFailure {
                        code: None,
                        stderr: format!("waiting for subprocess failed: {e}"),
                    })
                }
                Err(_) => {
                    return Err(OcrFailure::ProcessTimeout {
                        secs: timeout.as_secs(),
                    })
                }
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(OcrFailure::ProcessFailure {
                    code: output.status.code(),
                    stderr: stderr.chars().take(2000).collect(),
                });
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}

/// Models available in the local recognition runtime, probed once at startup.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    /// Probe the runtime via `ollama list`.
    ///
    /// A runtime that cannot be reached at all is fatal; an empty catalog is
    /// reported separately so the caller can distinguish "not installed" from
    /// "no models pulled".
    pub async fn detect() -> Result<Self, PdfOcrError> {
        Self::detect_with("ollama").await
    }

    /// Probe a specific binary; the seam used by tests.
    pub async fn detect_with(program: &str) -> Result<Self, PdfOcrError> {
        let output = Command::new(program)
            .arg("list")
            .output()
            .await
            .map_err(|e| PdfOcrError::RuntimeUnavailable {
                detail: format!("{program}: {e}"),
            })?;

        if !output.status.success() {
            return Err(PdfOcrError::RuntimeUnavailable {
                detail: format!("{program} list exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Self::from_listing(&stdout))
    }

    /// Build a catalog from a fixed model list (tests, embedding callers).
    pub fn from_models(models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            models: models.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse `ollama list` output: skip the header row, take the first
    /// whitespace-delimited token of each line when it looks like a model
    /// tag (contains `:`).
    fn from_listing(listing: &str) -> Self {
        let models = listing
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().next())
            .filter(|name| name.contains(':'))
            .map(str::to_owned)
            .collect();
        Self { models }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Resolve the model to use for a run.
    ///
    /// A requested model missing from the catalog is substituted with the
    /// first available one (logged at warn level); no request means the first
    /// available. An empty catalog is fatal before any page is attempted.
    pub fn resolve(&self, requested: Option<&str>) -> Result<String, PdfOcrError> {
        let first = self
            .models
            .first()
            .ok_or(PdfOcrError::NoModelsAvailable)?;

        match requested {
            Some(model) if self.contains(model) => Ok(model.to_string()),
            Some(model) => {
                warn!(
                    requested = model,
                    substitute = first.as_str(),
                    "requested model not available, substituting"
                );
                Ok(first.clone())
            }
            None => Ok(first.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
NAME                    ID              SIZE      MODIFIED
llava:7b                8dd30f6b0cb1    4.7 GB    3 weeks ago
minicpm-v:latest        1862d7d5fee5    5.5 GB    6 days ago
";

    #[test]
    fn listing_parse_skips_header_and_keeps_tags() {
        let catalog = ModelCatalog::from_listing(LISTING);
        assert_eq!(catalog.models(), ["llava:7b", "minicpm-v:latest"]);
    }

    #[test]
    fn listing_parse_tolerates_blank_lines() {
        let catalog = ModelCatalog::from_listing("NAME ID\n\nllava:7b x\n\n");
        assert_eq!(catalog.models(), ["llava:7b"]);
    }

    #[test]
    fn resolve_prefers_requested_model() {
        let catalog = ModelCatalog::from_models(["llava:7b", "minicpm-v:latest"]);
        assert_eq!(catalog.resolve(Some("minicpm-v:latest")).unwrap(), "minicpm-v:latest");
    }

    #[test]
    fn resolve_substitutes_missing_model() {
        let catalog = ModelCatalog::from_models(["llava:7b"]);
        assert_eq!(catalog.resolve(Some("nonexistent:1b")).unwrap(), "llava:7b");
    }

    #[test]
    fn resolve_defaults_to_first_model() {
        let catalog = ModelCatalog::from_models(["llava:7b", "minicpm-v:latest"]);
        assert_eq!(catalog.resolve(None).unwrap(), "llava:7b");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn deadline_covers_a_child_that_never_reads_stdin() {
        use std::os::unix::fs::PermissionsExt;

        // A runtime that accepts the spawn but never drains its stdin pipe:
        // the image write alone would block forever once the pipe fills.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("stalled-runtime.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 8\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let recognizer = OllamaRecognizer::with_program(script.to_string_lossy());
        let image = vec![0u8; 1 << 20];
        let started = std::time::Instant::now();
        let err = recognizer
            .recognize("llava:7b", "read this page", &image, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, OcrFailure::ProcessTimeout { .. }), "got {err:?}");
        assert!(
            started.elapsed() < Duration::from_secs(4),
            "deadline not enforced: returned after {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn unreachable_runtime_is_fatal() {
        let err = tokio_test::block_on(ModelCatalog::detect_with("/nonexistent/ollama-binary"))
            .unwrap_err();
        assert!(matches!(err, PdfOcrError::RuntimeUnavailable { .. }));
    }

    #[test]
    fn empty_catalog_is_fatal() {
        let catalog = ModelCatalog::from_models(Vec::<String>::new());
        assert!(matches!(
            catalog.resolve(None),
            Err(PdfOcrError::NoModelsAvailable)
        ));
        assert!(matches!(
            catalog.resolve(Some("llava:7b")),
            Err(PdfOcrError::NoModelsAvailable)
        ));
    }
}
