//! Extraction prompts for the vision model.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON schema the model is asked for
//!    must stay in lockstep with what [`crate::ocr::normalize`] accepts;
//!    both live a module apart instead of scattered across call sites.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    spawning a real model process.

/// Instruction template for structured text extraction.
///
/// The model is asked for a single JSON object; anything it wraps around the
/// object (greetings, markdown fences, trailing commentary) is tolerated and
/// recovered by the brace-scan in [`crate::ocr::normalize::extract_json`].
const EXTRACTION_PROMPT: &str = r#"Analyze this image and extract all visible text.
Return the result as a JSON object with the following fields:
{
    "text": "all extracted text",
    "confidence": 0.95,
    "language": "detected language code ({lang}/en/de/fr etc.)",
    "blocks": [
        {
            "text": "block text",
            "bbox": [x, y, width, height],
            "confidence": 0.95
        }
    ]
}

Bounding boxes are in pixel coordinates of this image: x and y locate the
top-left corner, width and height the extent of the block.
The text is expected to be primarily in "{lang}".

IMPORTANT: Respond ONLY with the JSON object, no additional commentary."#;

/// Build the extraction prompt for a given language hint.
pub fn extraction_prompt(language_hint: &str) -> String {
    EXTRACTION_PROMPT.replace("{lang}", language_hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_language_hint() {
        let p = extraction_prompt("pl");
        assert!(p.contains("\"pl\""));
        assert!(!p.contains("{lang}"));
    }

    #[test]
    fn prompt_requests_schema_fields() {
        let p = extraction_prompt("en");
        for field in ["\"text\"", "\"confidence\"", "\"language\"", "\"blocks\"", "\"bbox\""] {
            assert!(p.contains(field), "prompt missing {field}");
        }
    }
}
