//! Data model for extraction results.
//!
//! Coordinate-space invariant: every [`TextBlock`]'s bounding box is expressed
//! in the pixel space of the page image it was extracted from. Transforming
//! into canvas space is the layout engine's job and always produces *new*
//! derived blocks — nothing here is ever rescaled in place.

use crate::error::OcrFailure;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::enhance::EnhanceStrategy;

/// One rendered PDF page, owned by the orchestrator for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImage {
    /// 0-based page index; stable ordering key for the whole pipeline.
    pub index: usize,
    /// PNG file on disk (rendered, possibly enhanced).
    pub path: PathBuf,
    /// Pixel width of the image at `path`.
    pub width: u32,
    /// Pixel height of the image at `path`.
    pub height: u32,
    /// Enhancement applied before extraction.
    pub enhancement: EnhanceStrategy,
}

/// A block of recognised text with its position and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Top-left x in source-image pixels.
    pub x: f64,
    /// Top-left y in source-image pixels.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// In `[0, 1]`; clamped during normalisation.
    pub confidence: f64,
    pub language: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TextBlock {
    /// A block spanning the full page, used when the model returned text but
    /// no usable block geometry. Downstream compositing always gets at least
    /// one overlay target this way.
    pub fn full_page(text: impl Into<String>, width: u32, height: u32, confidence: f64, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 0.0,
            y: 0.0,
            width: width as f64,
            height: height as f64,
            confidence,
            language: language.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Container for one page's extraction result; 1:1 with [`PageImage`].
///
/// Created by the extraction engine and immutable afterwards. On retry
/// exhaustion the result carries empty text, zero confidence and a populated
/// `error` — extraction failures never propagate as `Err` past the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    /// Full page text: the model's top-level text, or the newline-joined
    /// block texts when the model gave blocks only.
    pub text: String,
    pub blocks: Vec<TextBlock>,
    /// Detected language, "unknown" when the model omitted it.
    pub language: String,
    /// Overall confidence in `[0, 1]`.
    pub confidence: f64,
    /// Model that produced this result (after any substitution).
    pub model: String,
    /// Free-form diagnostics: attempt count, timings, degradation notes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Populated only on retry exhaustion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OcrFailure>,
}

impl OcrResult {
    /// An error-flagged result for a page whose extraction was exhausted.
    pub fn failed(model: impl Into<String>, error: OcrFailure) -> Self {
        Self {
            text: String::new(),
            blocks: Vec::new(),
            language: "unknown".to_string(),
            confidence: 0.0,
            model: model.into(),
            metadata: serde_json::Map::new(),
            error: Some(error),
        }
    }

    /// Whether this page contributed usable text.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Mean of block confidences, or 0 when there are no blocks.
    pub fn mean_block_confidence(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        self.blocks.iter().map(|b| b.confidence).sum::<f64>() / self.blocks.len() as f64
    }

    /// Newline-joined block texts, in block order.
    pub fn joined_block_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
