//! Canvas geometry for multi-page SVG composition.
//!
//! The layout engine turns a list of page dimensions into a canvas size plus
//! one placement per page. Two arrangements exist: `scroll` stacks pages
//! vertically (one visible at a time, navigation toggles visibility) and
//! `grid` tiles them into fixed-width columns. All geometry is computed here
//! and nowhere else; the compositor consumes placements, it never measures.
//!
//! Pages are never upscaled. A page larger than its grid cell is shrunk to
//! fit, a smaller one is centred at its natural size.

use crate::config::DisplayMode;
use crate::ocr::{PageImage, TextBlock};

/// Placement of one page on the composed canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    /// 0-based page index, matching [`PageImage::index`].
    pub index: usize,
    /// Canvas x of the page's top-left corner, centring included.
    pub x: f64,
    /// Canvas y of the page's top-left corner.
    pub y: f64,
    /// Displayed width after scaling.
    pub width: f64,
    /// Displayed height after scaling.
    pub height: f64,
    /// Uniform scale factor applied to the page, in `(0, 1]`.
    pub scale: f64,
}

impl PageGeometry {
    /// Map a text block from source-image pixel space into canvas space.
    ///
    /// Produces a new derived block; the source block (and its result) stay
    /// untouched so a re-layout under a different mode starts from pristine
    /// coordinates.
    pub fn transform_block(&self, block: &TextBlock) -> TextBlock {
        TextBlock {
            text: block.text.clone(),
            x: self.x + block.x * self.scale,
            y: self.y + block.y * self.scale,
            width: block.width * self.scale,
            height: block.height * self.scale,
            confidence: block.confidence,
            language: block.language.clone(),
            metadata: block.metadata.clone(),
        }
    }
}

/// Full canvas geometry: overall size plus per-page placements in
/// document order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasLayout {
    pub width: f64,
    pub height: f64,
    pub mode: DisplayMode,
    pub pages: Vec<PageGeometry>,
}

impl CanvasLayout {
    /// Compute the canvas layout for the given pages.
    pub fn compute(pages: &[PageImage], mode: DisplayMode, columns: usize, spacing: u32) -> Self {
        match mode {
            DisplayMode::Scroll => Self::scroll(pages, spacing),
            DisplayMode::Grid => Self::grid(pages, columns.max(1), spacing),
        }
    }

    /// Vertical stack: canvas width is the widest page, each page centred
    /// horizontally at natural size, `spacing` pixels between pages.
    fn scroll(pages: &[PageImage], spacing: u32) -> Self {
        let spacing = spacing as f64;
        let canvas_width = pages.iter().map(|p| p.width as f64).fold(0.0, f64::max);

        let mut placements = Vec::with_capacity(pages.len());
        let mut y = 0.0;
        for page in pages {
            let (w, h) = (page.width as f64, page.height as f64);
            placements.push(PageGeometry {
                index: page.index,
                x: (canvas_width - w) / 2.0,
                y,
                width: w,
                height: h,
                scale: 1.0,
            });
            y += h + spacing;
        }
        // Drop the trailing gap after the last page.
        let canvas_height = if pages.is_empty() { 0.0 } else { y - spacing };

        Self {
            width: canvas_width,
            height: canvas_height,
            mode: DisplayMode::Scroll,
            pages: placements,
        }
    }

    /// Fixed-column grid: every cell is sized for the largest page plus
    /// spacing, pages are scaled down to fit their cell (never up) and
    /// centred inside it.
    fn grid(pages: &[PageImage], columns: usize, spacing: u32) -> Self {
        if pages.is_empty() {
            return Self {
                width: 0.0,
                height: 0.0,
                mode: DisplayMode::Grid,
                pages: Vec::new(),
            };
        }

        let spacing = spacing as f64;
        let max_w = pages.iter().map(|p| p.width as f64).fold(0.0, f64::max);
        let max_h = pages.iter().map(|p| p.height as f64).fold(0.0, f64::max);
        let cell_w = max_w + spacing;
        let cell_h = max_h + spacing;

        let rows = pages.len().div_ceil(columns);

        let placements = pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let col = (i % columns) as f64;
                let row = (i / columns) as f64;
                let (w, h) = (page.width as f64, page.height as f64);
                let scale = (cell_w / w).min(cell_h / h).min(1.0);
                let (sw, sh) = (w * scale, h * scale);
                PageGeometry {
                    index: page.index,
                    x: col * cell_w + (cell_w - sw) / 2.0,
                    y: row * cell_h + (cell_h - sh) / 2.0,
                    width: sw,
                    height: sh,
                    scale,
                }
            })
            .collect();

        Self {
            width: columns as f64 * cell_w,
            height: rows as f64 * cell_h,
            mode: DisplayMode::Grid,
            pages: placements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::enhance::EnhanceStrategy;

    fn page(index: usize, width: u32, height: u32) -> PageImage {
        PageImage {
            index,
            path: format!("/tmp/page-{index}.png").into(),
            width,
            height,
            enhancement: EnhanceStrategy::Original,
        }
    }

    #[test]
    fn scroll_stacks_pages_with_spacing() {
        let pages = vec![page(0, 800, 600), page(1, 1000, 500), page(2, 900, 700)];
        let layout = CanvasLayout::compute(&pages, DisplayMode::Scroll, 2, 20);

        assert_eq!(layout.width, 1000.0);
        assert_eq!(layout.height, 600.0 + 20.0 + 500.0 + 20.0 + 700.0);
        assert_eq!(layout.pages[0].y, 0.0);
        assert_eq!(layout.pages[1].y, 620.0);
        assert_eq!(layout.pages[2].y, 1140.0);
        // Narrower pages are centred on the canvas.
        assert_eq!(layout.pages[0].x, 100.0);
        assert_eq!(layout.pages[1].x, 0.0);
        // Scroll never scales.
        assert!(layout.pages.iter().all(|p| p.scale == 1.0));
    }

    #[test]
    fn grid_cells_fit_the_largest_page() {
        let pages = vec![page(0, 800, 600), page(1, 1000, 500)];
        let layout = CanvasLayout::compute(&pages, DisplayMode::Grid, 2, 20);

        // Cell = (max_w + spacing, max_h + spacing); one row of two columns.
        assert_eq!(layout.width, 2.0 * 1020.0);
        assert_eq!(layout.height, 620.0);
        // Both pages fit their cell, so neither is scaled.
        assert!(layout.pages.iter().all(|p| p.scale == 1.0));
        // Second page sits in the second column, centred in its cell.
        assert_eq!(layout.pages[1].x, 1020.0 + (1020.0 - 1000.0) / 2.0);
        assert_eq!(layout.pages[1].y, (620.0 - 500.0) / 2.0);
    }

    #[test]
    fn grid_wraps_rows_by_column_count() {
        let pages: Vec<_> = (0..5).map(|i| page(i, 400, 300)).collect();
        let layout = CanvasLayout::compute(&pages, DisplayMode::Grid, 2, 10);

        assert_eq!(layout.height, 3.0 * 310.0);
        // Third row origin plus vertical centring inside the 310-high cell.
        assert_eq!(layout.pages[4].y, 2.0 * 310.0 + (310.0 - 300.0) / 2.0);
        assert_eq!(layout.pages[4].x, (410.0 - 400.0) / 2.0);
    }

    #[test]
    fn pages_are_never_upscaled() {
        // A tiny page in a huge cell keeps its natural size.
        let pages = vec![page(0, 2000, 1500), page(1, 100, 80)];
        let layout = CanvasLayout::compute(&pages, DisplayMode::Grid, 2, 0);

        let small = &layout.pages[1];
        assert_eq!(small.scale, 1.0);
        assert_eq!(small.width, 100.0);
        assert_eq!(small.height, 80.0);
    }

    #[test]
    fn block_transform_derives_new_coordinates() {
        let geom = PageGeometry {
            index: 0,
            x: 50.0,
            y: 200.0,
            width: 400.0,
            height: 300.0,
            scale: 0.5,
        };
        let block = TextBlock {
            text: "hello".into(),
            x: 100.0,
            y: 40.0,
            width: 200.0,
            height: 30.0,
            confidence: 0.9,
            language: "en".into(),
            metadata: serde_json::Map::new(),
        };

        let t = geom.transform_block(&block);
        assert_eq!(t.x, 50.0 + 100.0 * 0.5);
        assert_eq!(t.y, 200.0 + 40.0 * 0.5);
        assert_eq!(t.width, 100.0);
        assert_eq!(t.height, 15.0);
        // Source block untouched.
        assert_eq!(block.x, 100.0);
        assert_eq!(t.text, block.text);
    }

    #[test]
    fn empty_page_list_yields_zero_canvas() {
        for mode in [DisplayMode::Scroll, DisplayMode::Grid] {
            let layout = CanvasLayout::compute(&[], mode, 2, 20);
            assert_eq!(layout.width, 0.0);
            assert_eq!(layout.height, 0.0);
            assert!(layout.pages.is_empty());
        }
    }
}
