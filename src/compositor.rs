//! Multi-page SVG composition: page images plus positioned text overlays.
//!
//! The compositor consumes the placements computed by [`crate::layout`] and
//! emits a single self-contained SVG document. Per page it embeds the
//! rendered PNG as a base64 data URI and lays three text layers over it:
//!
//! 1. visible block text, positioned and sized from block geometry,
//! 2. an invisible duplicate of each block for text search and selection,
//! 3. one hidden whole-page node carrying the page text (truncated to the
//!    configured limit) so viewers that only search top-level nodes still
//!    find everything.
//!
//! A page whose PNG has gone missing still gets its full text layer — losing
//! an image must never lose the extracted text.
//!
//! In scroll mode with more than one page the document carries its own
//! navigation: two buttons and a small script that toggles page visibility.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::config::{DisplayMode, ProcessConfig};
use crate::layout::{CanvasLayout, PageGeometry};
use crate::ocr::{OcrResult, PageImage, TextBlock};

/// Visible overlay font size bounds, in canvas pixels.
const MIN_FONT_SIZE: f64 = 8.0;
const MAX_FONT_SIZE: f64 = 24.0;

/// Escape a string for use in XML text content or attribute values.
fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Font size for a block: 80% of its displayed height, clamped.
fn block_font_size(display_height: f64) -> f64 {
    (display_height * 0.8).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Pass-through translation: tag the text with the target language.
///
/// Returns `None` when the block is already in the target language or has
/// nothing to translate. Swapping in a real translator changes only this
/// function.
fn translate_stub(block: &TextBlock, target: &str) -> Option<String> {
    if block.text.trim().is_empty() || block.language == target {
        return None;
    }
    Some(format!("[{target}] {}", block.text))
}

/// Builds the composed SVG document for one processed PDF.
pub struct SvgCompositor<'a> {
    config: &'a ProcessConfig,
}

impl<'a> SvgCompositor<'a> {
    pub fn new(config: &'a ProcessConfig) -> Self {
        Self { config }
    }

    /// Compose the full document.
    ///
    /// `pages`, `results` and `layout.pages` are parallel, in document order.
    pub fn compose(
        &self,
        pages: &[PageImage],
        results: &[OcrResult],
        layout: &CanvasLayout,
    ) -> String {
        let mut svg = String::new();
        let translate_attr = match &self.config.translate_to {
            Some(lang) => format!(" data-translate-to=\"{}\"", xml_escape(lang)),
            None => String::new(),
        };
        let _ = write!(
            svg,
            concat!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
                "xmlns:xlink=\"http://www.w3.org/1999/xlink\" ",
                "width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" ",
                "data-display-mode=\"{mode}\"{translate}>\n"
            ),
            w = layout.width,
            h = layout.height,
            mode = layout.mode.as_str(),
            translate = translate_attr,
        );
        svg.push_str(self.stylesheet());

        let with_nav = layout.mode == DisplayMode::Scroll && pages.len() > 1;
        for ((page, result), geom) in pages.iter().zip(results).zip(&layout.pages) {
            self.compose_page(&mut svg, page, result, geom, with_nav);
        }

        if with_nav {
            self.compose_navigation(&mut svg, pages.len(), layout);
        }
        svg.push_str("</svg>\n");
        svg
    }

    fn stylesheet(&self) -> &'static str {
        if self.config.show_highlights {
            concat!(
                "<style>\n",
                ".block-box { fill: #ffd700; fill-opacity: 0; stroke: none; }\n",
                ".block-box:hover { fill-opacity: 0.25; }\n",
                ".block-text { fill: #1a1a1a; font-family: sans-serif; }\n",
                ".block-translation { fill: #00529b; font-family: sans-serif; font-style: italic; }\n",
                ".search-layer { fill: none; font-size: 1px; user-select: text; }\n",
                ".nav-button { fill: #333; cursor: pointer; }\n",
                ".nav-button:hover { fill: #555; }\n",
                ".nav-label { fill: #fff; font-family: sans-serif; pointer-events: none; }\n",
                "</style>\n"
            )
        } else {
            concat!(
                "<style>\n",
                ".block-text { fill: #1a1a1a; font-family: sans-serif; }\n",
                ".block-translation { fill: #00529b; font-family: sans-serif; font-style: italic; }\n",
                ".search-layer { fill: none; font-size: 1px; user-select: text; }\n",
                ".nav-button { fill: #333; cursor: pointer; }\n",
                ".nav-button:hover { fill: #555; }\n",
                ".nav-label { fill: #fff; font-family: sans-serif; pointer-events: none; }\n",
                "</style>\n"
            )
        }
    }

    fn compose_page(
        &self,
        svg: &mut String,
        page: &PageImage,
        result: &OcrResult,
        geom: &PageGeometry,
        with_nav: bool,
    ) {
        // In navigated scroll mode only the first page starts visible.
        let hidden = if with_nav && page.index > 0 {
            " style=\"display:none\""
        } else {
            ""
        };
        let _ = write!(
            svg,
            "<g class=\"page\" id=\"page-{n}\" data-page=\"{n}\"{hidden}>\n",
            n = page.index + 1,
        );

        match std::fs::read(&page.path) {
            Ok(bytes) => {
                let _ = write!(
                    svg,
                    concat!(
                        "<image x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" ",
                        "href=\"data:image/png;base64,{data}\"/>\n"
                    ),
                    x = geom.x,
                    y = geom.y,
                    w = geom.width,
                    h = geom.height,
                    data = BASE64.encode(&bytes),
                );
            }
            Err(e) => {
                // Text layers below are emitted regardless.
                warn!(
                    page = page.index,
                    path = %page.path.display(),
                    "page image unreadable during composition: {e}"
                );
                let _ = write!(
                    svg,
                    concat!(
                        "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" ",
                        "fill=\"#f5f5f5\" stroke=\"#cccccc\"/>\n"
                    ),
                    x = geom.x,
                    y = geom.y,
                    w = geom.width,
                    h = geom.height,
                );
            }
        }

        svg.push_str("<g class=\"text-layer\">\n");
        for block in &result.blocks {
            self.compose_block(svg, block, geom);
        }
        svg.push_str("</g>\n");

        // Whole-page search node, hidden but present in the DOM.
        let page_text: String = result.text.chars().take(self.config.search_text_limit).collect();
        if !page_text.is_empty() {
            let _ = write!(
                svg,
                "<text class=\"page-search\" display=\"none\" data-page=\"{n}\">{text}</text>\n",
                n = page.index + 1,
                text = xml_escape(&page_text),
            );
        }
        debug!(page = page.index, blocks = result.blocks.len(), "page composed");

        svg.push_str("</g>\n");
    }

    fn compose_block(&self, svg: &mut String, block: &TextBlock, geom: &PageGeometry) {
        let b = geom.transform_block(block);
        if b.text.trim().is_empty() {
            return;
        }
        let font_size = block_font_size(b.height);

        if self.config.show_highlights {
            let _ = write!(
                svg,
                concat!(
                    "<rect class=\"block-box\" x=\"{x}\" y=\"{y}\" ",
                    "width=\"{w}\" height=\"{h}\">",
                    "<title>confidence: {conf:.2}</title></rect>\n"
                ),
                x = b.x,
                y = b.y,
                w = b.width,
                h = b.height,
                conf = b.confidence,
            );
        }

        // Baseline sits roughly at the visual centre of the block.
        let baseline = b.y + (b.height + font_size * 0.7) / 2.0;
        let _ = write!(
            svg,
            "<text class=\"block-text\" x=\"{x}\" y=\"{y}\" font-size=\"{size:.1}\" textLength=\"{len}\" lengthAdjust=\"spacingAndGlyphs\">{text}</text>\n",
            x = b.x,
            y = baseline,
            size = font_size,
            len = b.width,
            text = xml_escape(&b.text),
        );

        if let Some(target) = &self.config.translate_to {
            if let Some(translated) = translate_stub(&b, target) {
                let _ = write!(
                    svg,
                    "<text class=\"block-translation\" x=\"{x}\" y=\"{y}\" font-size=\"{size:.1}\">{text}</text>\n",
                    x = b.x,
                    y = baseline + font_size,
                    size = (font_size * 0.85).max(MIN_FONT_SIZE),
                    text = xml_escape(&translated),
                );
            }
        }

        // Invisible duplicate so the text stays searchable and selectable
        // even where the visible run is covered or scaled away.
        let _ = write!(
            svg,
            "<text class=\"search-layer\" x=\"{x}\" y=\"{y}\">{text}</text>\n",
            x = b.x,
            y = b.y + b.height,
            text = xml_escape(&b.text),
        );
    }

    fn compose_navigation(&self, svg: &mut String, page_count: usize, layout: &CanvasLayout) {
        let y = layout.height - 40.0;
        let _ = write!(
            svg,
            concat!(
                "<g class=\"nav\" id=\"nav\">\n",
                "<rect class=\"nav-button\" x=\"10\" y=\"{y}\" width=\"80\" height=\"30\" rx=\"4\" onclick=\"showPage(-1)\"/>\n",
                "<text class=\"nav-label\" x=\"50\" y=\"{ty}\" text-anchor=\"middle\">Prev</text>\n",
                "<rect class=\"nav-button\" x=\"100\" y=\"{y}\" width=\"80\" height=\"30\" rx=\"4\" onclick=\"showPage(1)\"/>\n",
                "<text class=\"nav-label\" x=\"140\" y=\"{ty}\" text-anchor=\"middle\">Next</text>\n",
                "<text class=\"nav-counter\" id=\"nav-counter\" x=\"200\" y=\"{ty}\">1 / {count}</text>\n",
                "</g>\n"
            ),
            y = y,
            ty = y + 20.0,
            count = page_count,
        );
        let _ = write!(
            svg,
            concat!(
                "<script><![CDATA[\n",
                "var currentPage = 1;\n",
                "var totalPages = {count};\n",
                "function showPage(delta) {{\n",
                "  var next = currentPage + delta;\n",
                "  if (next < 1 || next > totalPages) return;\n",
                "  document.getElementById('page-' + currentPage).style.display = 'none';\n",
                "  document.getElementById('page-' + next).style.display = '';\n",
                "  currentPage = next;\n",
                "  document.getElementById('nav-counter').textContent = currentPage + ' / ' + totalPages;\n",
                "}}\n",
                "]]></script>\n"
            ),
            count = page_count,
        );
    }
}
