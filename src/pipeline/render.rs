//! PDF rasterisation: render every page to a PNG on disk via pdfium.
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not be driven from async contexts, so the
//! whole render runs inside `tokio::task::spawn_blocking`.
//!
//! Target size is derived from the configured DPI (A4 width as the
//! reference) and capped by `max_rendered_pixels`: page sizes vary wildly
//! and an A0 poster at 200 DPI would otherwise produce a 16 000 px image,
//! exhausting memory for no recognition benefit.

use crate::config::ProcessConfig;
use crate::error::PdfOcrError;
use crate::ocr::PageImage;
use crate::pipeline::enhance::EnhanceStrategy;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// A4 width in inches; reference edge for the DPI → pixel conversion.
const REFERENCE_PAGE_WIDTH_IN: f64 = 8.27;

/// Pixel target for the rendered page width.
fn target_width(dpi: u32, max_pixels: u32) -> u32 {
    ((REFERENCE_PAGE_WIDTH_IN * dpi as f64) as u32).min(max_pixels)
}

/// Rasterise all pages of a PDF into PNG files under `work_dir`.
///
/// Pages are enhanced per `config.enhance` before being written. The
/// returned list is in document order with contiguous 0-based indices.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ProcessConfig,
    work_dir: &Path,
) -> Result<Vec<PageImage>, PdfOcrError> {
    let path = pdf_path.to_path_buf();
    let dir = work_dir.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let enhance = config.enhance;

    let pages = tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, &dir, dpi, max_pixels, password.as_deref(), enhance)
    })
    .await
    .map_err(|e| PdfOcrError::Internal(format!("render task panicked: {e}")))??;

    if pages.is_empty() {
        return Err(PdfOcrError::NoPagesRendered {
            path: pdf_path.to_path_buf(),
        });
    }
    Ok(pages)
}

fn render_pages_blocking(
    pdf_path: &Path,
    work_dir: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    enhance: EnhanceStrategy,
) -> Result<Vec<PageImage>, PdfOcrError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PdfOcrError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PdfOcrError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PdfOcrError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {total} pages");

    let width = target_width(dpi, max_pixels);
    let render_config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(max_pixels as i32);

    let mut rendered = Vec::with_capacity(total);
    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PdfOcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| PdfOcrError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;

        let image = enhance.apply(bitmap.as_image());
        let out_path: PathBuf = work_dir.join(format!("page-{:04}.png", idx + 1));
        image
            .save_with_format(&out_path, ImageFormat::Png)
            .map_err(|e| PdfOcrError::OutputWriteFailed {
                path: out_path.clone(),
                source: std::io::Error::other(e),
            })?;

        debug!(
            "rendered page {} → {}x{} px ({})",
            idx + 1,
            image.width(),
            image.height(),
            out_path.display()
        );

        rendered.push(PageImage {
            index: idx,
            path: out_path,
            width: image.width(),
            height: image.height(),
            enhancement: enhance,
        });
    }

    if rendered.is_empty() {
        warn!("document contained no pages");
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_width_follows_dpi_until_the_cap() {
        // 100 DPI on an A4 reference is well under the cap.
        assert_eq!(target_width(100, 2048), 827);
        // 300 DPI would exceed it.
        assert_eq!(target_width(300, 2048), 2048);
    }

    #[tokio::test]
    #[ignore = "requires a pdfium shared library"]
    async fn corrupt_pdf_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 garbage with no xref").unwrap();

        let config = crate::ProcessConfig::default();
        let err = render_pages(&path, &config, dir.path()).await.unwrap_err();
        assert!(matches!(err, PdfOcrError::CorruptPdf { .. }), "got {err:?}");
    }
}
