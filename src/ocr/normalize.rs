//! Result normalisation: coerce raw model output into a canonical [`OcrResult`].
//!
//! Vision models are unreliable JSON emitters. They wrap the object in prose
//! or markdown fences, return confidences as strings, send `1.7` for a
//! probability, or emit blocks with three bbox components. The policy here is
//! **never discard model output, only downgrade its trust score**: anything
//! that cannot be recovered as structure is kept as plain text with a fixed
//! low confidence, and only individual blocks that fail the bbox invariant
//! are dropped.
//!
//! Parsing is an explicit [`Result`] branch, not an exception-shaped control
//! flow: [`parse_attempt`] returns [`ParseFailureKind`] and the caller decides
//! whether that means retry or degrade.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::result::{OcrResult, TextBlock};

/// Confidence assigned when the output held no JSON at all and the raw text
/// was kept as-is.
pub const CONFIDENCE_UNPARSED: f64 = 0.5;

/// Confidence assigned when a JSON object was found but failed to parse.
pub const CONFIDENCE_PARSE_FAILED: f64 = 0.3;

/// Why a parse attempt produced no structured object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailureKind {
    /// Output contained no `{ … }` span at all.
    NoJsonFound,
    /// A candidate span was found but `serde_json` rejected it.
    InvalidJson(String),
}

// First `{` to last `}`, spanning newlines. Greedy `.*` under (?s) is exactly
// the brace-scan heuristic.
static RE_JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Recover the JSON-object candidate from free-form model output.
///
/// Locates the substring from the first `{` to the last `}`. Returns `None`
/// when no such span exists, leaving the caller to fall back to plain text.
pub fn extract_json(output: &str) -> Option<&str> {
    RE_JSON_OBJECT.find(output).map(|m| m.as_str())
}

/// Attempt to parse model output into a JSON value.
///
/// The fallback path (plain-text degradation) is the caller's branch on
/// `Err`, not an error handler.
pub fn parse_attempt(output: &str) -> Result<Value, ParseFailureKind> {
    let candidate = extract_json(output).ok_or(ParseFailureKind::NoJsonFound)?;
    serde_json::from_str(candidate).map_err(|e| ParseFailureKind::InvalidJson(e.to_string()))
}

/// Normalise a parsed JSON value into a canonical [`OcrResult`].
///
/// Coercion rules:
/// - `text` → string (non-string scalars stringified, missing → empty)
/// - `confidence` → f64 clamped into `[0, 1]` (numeric strings accepted)
/// - `language` → string, defaulting to `"unknown"`
/// - each block requires at least 4 numeric bbox components (either a
///   `bbox: [x, y, w, h]` array or explicit `x`/`y`/`width`/`height`
///   fields); blocks failing this are dropped, the page is not
/// - block confidence defaults to the parent's, block language to the
///   parent's language
///
/// When no block survives but the top-level text is non-empty, a single
/// full-page block is synthesised so compositing always has an overlay
/// target.
pub fn normalize_parsed(
    value: &Value,
    page_width: u32,
    page_height: u32,
) -> OcrResult {
    let text = coerce_string(value.get("text"));
    let confidence = coerce_confidence(value.get("confidence")).unwrap_or(0.0);
    let language = match value.get("language") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => "unknown".to_string(),
    };

    let mut blocks = Vec::new();
    if let Some(Value::Array(raw_blocks)) = value.get("blocks") {
        for (i, raw) in raw_blocks.iter().enumerate() {
            match normalize_block(raw, confidence, &language) {
                Some(block) => blocks.push(block),
                None => debug!("dropping block {i}: missing or non-numeric bbox"),
            }
        }
    }

    // The model sometimes answers with blocks only; derive the page text so
    // the searchable layer is never empty when blocks exist.
    let text = if text.trim().is_empty() && !blocks.is_empty() {
        blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text
    };

    if blocks.is_empty() && !text.trim().is_empty() {
        blocks.push(TextBlock::full_page(
            text.clone(),
            page_width,
            page_height,
            confidence,
            language.clone(),
        ));
    }

    OcrResult {
        text,
        blocks,
        language,
        confidence,
        model: String::new(),
        metadata: serde_json::Map::new(),
        error: None,
    }
}

/// A degraded plain-text result for output that held no usable structure.
pub fn plain_text_result(
    output: &str,
    confidence: f64,
    page_width: u32,
    page_height: u32,
) -> OcrResult {
    let text = output.trim().to_string();
    let mut blocks = Vec::new();
    if !text.is_empty() {
        blocks.push(TextBlock::full_page(
            text.clone(),
            page_width,
            page_height,
            confidence,
            "unknown",
        ));
    }
    OcrResult {
        text,
        blocks,
        language: "unknown".to_string(),
        confidence,
        model: String::new(),
        metadata: serde_json::Map::new(),
        error: None,
    }
}

fn normalize_block(raw: &Value, parent_confidence: f64, parent_language: &str) -> Option<TextBlock> {
    let obj = raw.as_object()?;

    let (x, y, width, height) = match obj.get("bbox") {
        Some(Value::Array(bbox)) => {
            if bbox.len() < 4 {
                return None;
            }
            let mut nums = bbox.iter().take(4).map(coerce_number);
            (nums.next()??, nums.next()??, nums.next()??, nums.next()??)
        }
        // Some models answer with explicit fields instead of a bbox array.
        _ => (
            coerce_number(obj.get("x")?)?,
            coerce_number(obj.get("y")?)?,
            coerce_number(obj.get("width")?)?,
            coerce_number(obj.get("height")?)?,
        ),
    };

    let confidence = coerce_confidence(obj.get("confidence")).unwrap_or(parent_confidence);
    let language = match obj.get("language") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => parent_language.to_string(),
    };
    let metadata = match obj.get("metadata") {
        Some(Value::Object(m)) => m.clone(),
        _ => serde_json::Map::new(),
    };

    Some(TextBlock {
        text: coerce_string(obj.get("text")),
        x,
        y,
        width,
        height,
        confidence,
        language,
        metadata,
    })
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_confidence(value: Option<&Value>) -> Option<f64> {
    value.and_then(coerce_number).map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn brace_scan_recovers_embedded_object() {
        let out = "noise {\"text\":\"hi\"} trailing";
        assert_eq!(extract_json(out), Some("{\"text\":\"hi\"}"));
    }

    #[test]
    fn brace_scan_spans_nested_objects_and_newlines() {
        let out = "Sure!\n{\"text\":\"a\",\n \"blocks\":[{\"text\":\"b\"}]}\nHope that helps.";
        let span = extract_json(out).unwrap();
        assert!(span.starts_with('{') && span.ends_with('}'));
        assert!(span.contains("\"blocks\""));
    }

    #[test]
    fn no_braces_yields_no_json() {
        assert_eq!(extract_json("just plain text, no structure"), None);
        assert_eq!(
            parse_attempt("just plain text"),
            Err(ParseFailureKind::NoJsonFound)
        );
    }

    #[test]
    fn invalid_json_is_reported_not_panicked() {
        let err = parse_attempt("prefix {not json} suffix").unwrap_err();
        assert!(matches!(err, ParseFailureKind::InvalidJson(_)));
    }

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        let high = normalize_parsed(&json!({"text": "t", "confidence": 1.7}), 100, 100);
        assert_eq!(high.confidence, 1.0);

        let low = normalize_parsed(&json!({"text": "t", "confidence": -0.2}), 100, 100);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn numeric_string_confidence_is_accepted() {
        let r = normalize_parsed(&json!({"text": "t", "confidence": "0.85"}), 100, 100);
        assert!((r.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn language_defaults_to_unknown() {
        let r = normalize_parsed(&json!({"text": "t"}), 100, 100);
        assert_eq!(r.language, "unknown");
    }

    #[test]
    fn short_bbox_drops_block_not_page() {
        let value = json!({
            "text": "page text",
            "confidence": 0.9,
            "blocks": [
                {"text": "good", "bbox": [1, 2, 3, 4], "confidence": 0.8},
                {"text": "bad", "bbox": [1, 2, 3], "confidence": 0.8},
            ],
        });
        let r = normalize_parsed(&value, 800, 600);
        assert_eq!(r.blocks.len(), 1);
        assert_eq!(r.blocks[0].text, "good");
        assert_eq!(r.text, "page text");
    }

    #[test]
    fn only_malformed_blocks_synthesises_one_full_page_block() {
        let value = json!({
            "text": "salvaged text",
            "confidence": 0.9,
            "blocks": [{"text": "bad", "bbox": [1]}],
        });
        let r = normalize_parsed(&value, 800, 600);
        assert_eq!(r.blocks.len(), 1);
        assert_eq!(r.blocks[0].text, "salvaged text");
        assert_eq!(r.blocks[0].width, 800.0);
        assert_eq!(r.blocks[0].height, 600.0);
    }

    #[test]
    fn explicit_xywh_fields_are_accepted() {
        let value = json!({
            "text": "t",
            "blocks": [{"text": "b", "x": 10, "y": 20, "width": 30, "height": 40}],
        });
        let r = normalize_parsed(&value, 100, 100);
        assert_eq!(r.blocks.len(), 1);
        assert_eq!(r.blocks[0].x, 10.0);
        assert_eq!(r.blocks[0].height, 40.0);
    }

    #[test]
    fn block_confidence_defaults_to_parent() {
        let value = json!({
            "text": "t",
            "confidence": 0.7,
            "blocks": [{"text": "b", "bbox": [0, 0, 10, 10]}],
        });
        let r = normalize_parsed(&value, 100, 100);
        assert_eq!(r.blocks[0].confidence, 0.7);
    }

    #[test]
    fn block_only_output_derives_page_text() {
        let value = json!({
            "blocks": [
                {"text": "line one", "bbox": [0, 0, 10, 10]},
                {"text": "line two", "bbox": [0, 12, 10, 10]},
            ],
        });
        let r = normalize_parsed(&value, 100, 100);
        assert_eq!(r.text, "line one\nline two");
    }

    #[test]
    fn plain_text_result_keeps_everything() {
        let r = plain_text_result("  raw model rambling  ", CONFIDENCE_UNPARSED, 640, 480);
        assert_eq!(r.text, "raw model rambling");
        assert_eq!(r.confidence, 0.5);
        assert_eq!(r.blocks.len(), 1);
        assert_eq!(r.blocks[0].width, 640.0);
    }

    #[test]
    fn empty_plain_text_gets_no_block() {
        let r = plain_text_result("   ", CONFIDENCE_PARSE_FAILED, 640, 480);
        assert!(r.blocks.is_empty());
        assert!(r.text.is_empty());
    }
}
