//! Bounded-concurrency orchestration of per-page extraction.
//!
//! Pages flow through `buffer_unordered(workers)`, so at most `workers`
//! recognition subprocesses are alive at any moment while completions are
//! consumed in whatever order they finish. Results land in a pre-allocated
//! slot vector keyed by page index, which restores document order without a
//! sort and makes the "every page accounted for exactly once" invariant a
//! structural property rather than a bookkeeping one.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

use crate::config::ProcessConfig;
use crate::error::OcrFailure;
use crate::ocr::{OcrEngine, OcrResult, PageImage, Recognizer};

/// Effective worker count: configured value clamped into
/// `1..=available_parallelism`.
pub fn effective_workers(configured: usize) -> usize {
    let max = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    configured.clamp(1, max)
}

/// Extract every page, at most `config.workers` at a time.
///
/// The returned vector has exactly `pages.len()` entries in document order.
/// Failed pages are represented by error-flagged results; this function never
/// loses a page and never fails the batch for one page.
#[instrument(skip_all, fields(pages = pages.len()))]
pub async fn run_batch<R: Recognizer>(
    engine: &OcrEngine<R>,
    pages: &[PageImage],
    config: &ProcessConfig,
) -> Vec<OcrResult> {
    let total = pages.len();
    if total == 0 {
        return Vec::new();
    }

    let workers = effective_workers(config.workers);
    info!(workers, total, model = engine.model(), "starting extraction batch");

    let callback = config.progress_callback.clone();
    if let Some(cb) = &callback {
        cb.on_batch_start(total);
    }

    let mut slots: Vec<Option<OcrResult>> = (0..total).map(|_| None).collect();

    let mut completed = stream::iter(pages.iter().map(|page| {
        let callback = callback.clone();
        async move {
            if let Some(cb) = &callback {
                cb.on_page_start(page.index + 1, total);
            }
            let result = engine.extract(page).await;
            (page.index, result)
        }
    }))
    .buffer_unordered(workers);

    let mut success_count = 0usize;
    while let Some((index, result)) = completed.next().await {
        if let Some(cb) = &callback {
            match &result.error {
                None => cb.on_page_complete(index + 1, total, result.confidence),
                Some(e) => cb.on_page_error(index + 1, total, &e.to_string()),
            }
        }
        if result.is_success() {
            success_count += 1;
        }
        debug!(page = index, success = result.is_success(), "page finished");

        match slots.get_mut(index) {
            Some(slot) => *slot = Some(result),
            None => debug!(page = index, "result index out of range, dropping"),
        }
    }

    if let Some(cb) = &callback {
        cb.on_batch_complete(total, success_count);
    }

    // Every slot is filled when page indices are the contiguous 0..n the
    // renderer produces; a hole means a malformed page list upstream.
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.unwrap_or_else(|| {
                OcrResult::failed(
                    engine.model(),
                    OcrFailure::ValidationError {
                        detail: format!("no result produced for page index {i}"),
                    },
                )
            })
        })
        .collect()
}
