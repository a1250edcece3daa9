//! WebVTT subtitle flattening.
//!
//! Auto-generated captions repeat each line across several rolling cues, so
//! consecutive duplicates are collapsed.

use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Turn a WebVTT document into plain transcript text, one cue line per line.
pub fn flatten(document: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_block = false;

    for raw in document.lines() {
        let line = raw.trim();

        if line.is_empty() {
            in_block = false;
            continue;
        }
        if in_block {
            continue;
        }
        if line.starts_with("WEBVTT")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
        {
            continue;
        }
        if line.starts_with("NOTE") || line.starts_with("STYLE") || line.starts_with("REGION") {
            in_block = true;
            continue;
        }
        if line.contains("-->") || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let text = decode_entities(&INLINE_TAG.replace_all(line, ""));
        let text = text.trim();
        if text.is_empty() || lines.last().map(String::as_str) == Some(text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
