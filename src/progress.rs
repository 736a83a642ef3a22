//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::ProcessConfigBuilder::progress_callback`] to receive
//! real-time events as the orchestrator works through a document.
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, or a terminal progress bar
//! without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` because pages are extracted
//! concurrently.

use std::sync::Arc;

/// Called by the orchestrator as pages move through extraction.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With more than one worker, `on_page_start`,
/// `on_page_complete` and `on_page_error` may be called concurrently;
/// implementations must synchronise shared mutable state.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Called once before any page is extracted.
    fn on_batch_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page's first recognition attempt.
    ///
    /// `page_num` is 1-indexed throughout.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's extraction finished with usable text.
    ///
    /// `confidence` is the page's normalised confidence in `[0, 1]`.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, confidence: f64) {
        let _ = (page_num, total_pages, confidence);
    }

    /// Called when a page failed after all retries were exhausted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ProcessConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;
