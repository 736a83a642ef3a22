//! Configuration types for PDF-to-SVG OCR processing.
//!
//! All processing behaviour is controlled through [`ProcessConfig`], built via
//! its [`ProcessConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across concurrent jobs, log them, and diff two
//! runs to understand why their outputs differ.
//!
//! There is no global mutable state anywhere in the pipeline: the config (and
//! the [`crate::ocr::ModelCatalog`] probed at startup) are constructed once
//! and passed read-only into the orchestrator and extraction engine.

use crate::error::PdfOcrError;
use crate::pipeline::enhance::EnhanceStrategy;
use crate::progress::ProgressCallback;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How pages are arranged on the composed SVG canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Pages stacked vertically, one visible at a time with navigation. (default)
    #[default]
    Scroll,
    /// Pages laid out in a fixed-column grid, all visible.
    Grid,
}

impl DisplayMode {
    /// Value of the `data-display-mode` attribute on the SVG root.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Scroll => "scroll",
            DisplayMode::Grid => "grid",
        }
    }
}

/// Configuration for a PDF-to-SVG OCR run.
///
/// Built via [`ProcessConfig::builder()`] or using
/// [`ProcessConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfocr::{DisplayMode, ProcessConfig};
///
/// let config = ProcessConfig::builder()
///     .dpi(200)
///     .workers(4)
///     .model("llava:7b")
///     .display_mode(DisplayMode::Grid)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ProcessConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 200.
    ///
    /// 200 DPI keeps small print legible for vision models while staying under
    /// the pixel cap for typical page sizes.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2048.
    ///
    /// A safety cap independent of DPI: an A0 poster at 200 DPI would
    /// otherwise produce a 13 000 px image and exhaust both memory and the
    /// model's useful input resolution.
    pub max_rendered_pixels: u32,

    /// Number of concurrent recognition subprocesses. Default: 4.
    ///
    /// Each worker holds one model invocation; vision models are heavy, so
    /// this bounds peak RAM and keeps the runtime responsive. Clamped to
    /// `1..=available_parallelism` by the orchestrator.
    pub workers: usize,

    /// Recognition model identifier, e.g. "llava:7b". If None, the first
    /// model in the probed catalog is used.
    pub model: Option<String>,

    /// Language hint embedded in the extraction prompt. Default: "en".
    pub language_hint: String,

    /// Hard deadline for one recognition subprocess invocation. Default: 300s.
    ///
    /// Local vision models can take minutes on a dense page; past this the
    /// child is killed and the attempt enters the retry path.
    pub ocr_timeout_secs: u64,

    /// Backoff and retryability configuration, shared across all jobs.
    pub retry: RetryPolicy,

    /// Page enhancement applied before extraction. Default: [`EnhanceStrategy::Original`].
    pub enhance: EnhanceStrategy,

    /// Canvas layout for the composed SVG. Default: [`DisplayMode::Scroll`].
    pub display_mode: DisplayMode,

    /// Column count in grid mode. Default: 2.
    pub grid_columns: usize,

    /// Inter-page spacing on the canvas, in pixels. Default: 20.
    pub page_spacing: u32,

    /// Target display language for translation overlays. None disables them.
    ///
    /// Blocks whose detected language differs from this get a secondary
    /// translated text run positioned just below the original. Translation is
    /// a pass-through transform; wiring a real translator is the caller's job.
    pub translate_to: Option<String>,

    /// Whether block backgrounds highlight on hover. Default: true.
    pub show_highlights: bool,

    /// Keep the rendered page PNGs next to the SVG. Default: false.
    pub save_images: bool,

    /// Character cap on each page's hidden whole-page search node. Default: 1000.
    pub search_text_limit: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress callback invoked per page as extraction proceeds.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 2048,
            workers: 4,
            model: None,
            language_hint: "en".to_string(),
            ocr_timeout_secs: 300,
            retry: RetryPolicy::default(),
            enhance: EnhanceStrategy::Original,
            display_mode: DisplayMode::Scroll,
            grid_columns: 2,
            page_spacing: 20,
            translate_to: None,
            show_highlights: true,
            save_images: false,
            search_text_limit: 1000,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("workers", &self.workers)
            .field("model", &self.model)
            .field("language_hint", &self.language_hint)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("retry", &self.retry)
            .field("enhance", &self.enhance)
            .field("display_mode", &self.display_mode)
            .field("grid_columns", &self.grid_columns)
            .field("page_spacing", &self.page_spacing)
            .field("translate_to", &self.translate_to)
            .field("show_highlights", &self.show_highlights)
            .field("save_images", &self.save_images)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ProcessConfig {
    /// Create a new builder for `ProcessConfig`.
    pub fn builder() -> ProcessConfigBuilder {
        ProcessConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessConfig`].
#[derive(Debug)]
pub struct ProcessConfigBuilder {
    config: ProcessConfig,
}

impl ProcessConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn language_hint(mut self, lang: impl Into<String>) -> Self {
        self.config.language_hint = lang.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs.max(1);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn enhance(mut self, strategy: EnhanceStrategy) -> Self {
        self.config.enhance = strategy;
        self
    }

    pub fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.config.display_mode = mode;
        self
    }

    pub fn grid_columns(mut self, n: usize) -> Self {
        self.config.grid_columns = n.max(1);
        self
    }

    pub fn page_spacing(mut self, px: u32) -> Self {
        self.config.page_spacing = px;
        self
    }

    pub fn translate_to(mut self, lang: impl Into<String>) -> Self {
        self.config.translate_to = Some(lang.into());
        self
    }

    pub fn show_highlights(mut self, v: bool) -> Self {
        self.config.show_highlights = v;
        self
    }

    pub fn save_images(mut self, v: bool) -> Self {
        self.config.save_images = v;
        self
    }

    pub fn search_text_limit(mut self, n: usize) -> Self {
        self.config.search_text_limit = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessConfig, PdfOcrError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(PdfOcrError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.workers == 0 {
            return Err(PdfOcrError::InvalidConfig("workers must be ≥ 1".into()));
        }
        if c.grid_columns == 0 {
            return Err(PdfOcrError::InvalidConfig(
                "grid columns must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_out_of_range_values() {
        let config = ProcessConfig::builder()
            .dpi(50)
            .workers(0)
            .grid_columns(0)
            .build()
            .unwrap();
        assert_eq!(config.dpi, 72);
        assert_eq!(config.workers, 1);
        assert_eq!(config.grid_columns, 1);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ProcessConfig::default();
        assert_eq!(config.dpi, 200);
        assert_eq!(config.workers, 4);
        assert_eq!(config.ocr_timeout_secs, 300);
        assert_eq!(config.display_mode, DisplayMode::Scroll);
        assert_eq!(config.grid_columns, 2);
        assert!(config.translate_to.is_none());
        assert!(config.show_highlights);
    }

    #[test]
    fn display_mode_data_attribute_values() {
        assert_eq!(DisplayMode::Scroll.as_str(), "scroll");
        assert_eq!(DisplayMode::Grid.as_str(), "grid");
    }
}
