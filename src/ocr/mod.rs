//! Text extraction: recognition backends, output normalisation and the
//! fault-tolerant per-page engine.
//!
//! Flow for one page: [`engine::OcrEngine::extract`] reads the page image,
//! shells out through a [`recognizer::Recognizer`], recovers a JSON object
//! from whatever the model printed ([`normalize`]), and retries transient
//! failures per the configured [`crate::retry::RetryPolicy`]. The output is
//! always an [`OcrResult`] — failure is data here, not control flow.

pub mod engine;
pub mod normalize;
pub mod recognizer;
pub mod result;

pub use engine::OcrEngine;
pub use recognizer::{ModelCatalog, OllamaRecognizer, Recognizer};
pub use result::{OcrResult, PageImage, TextBlock};
