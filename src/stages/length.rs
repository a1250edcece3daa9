//! Post-hoc length enforcement for generated content.
//!
//! Content within the limit is never touched. Content slightly over the limit
//! (inside the tolerance band) is trimmed back to the last whole word that fits.
//! Anything further over is cut at the limit and marked as continued. Either way
//! the result measures at or under the limit.

use crate::config::{LengthConfig, PlatformSpec};

use super::LengthUnit;

/// What enforcement did to a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    Unchanged,
    Trimmed,
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforced {
    pub content: String,
    pub length_metric: usize,
    pub action: Enforcement,
}

/// Measure text in the given unit
pub fn measure(text: &str, unit: LengthUnit) -> usize {
    match unit {
        LengthUnit::Words => text.split_whitespace().count(),
        LengthUnit::Chars => text.chars().count(),
    }
}

/// Bring `text` within the platform limit
pub fn enforce(text: &str, spec: &PlatformSpec, config: &LengthConfig) -> Enforced {
    let metric = measure(text, spec.unit);
    let tolerance = (spec.limit as f64 * config.tolerance_ratio).floor() as usize;

    let (content, action) = if metric <= spec.limit {
        (text.to_string(), Enforcement::Unchanged)
    } else if metric <= spec.limit + tolerance {
        (soft_trim(text, spec.limit, spec.unit), Enforcement::Trimmed)
    } else {
        (
            hard_truncate(text, spec.limit, spec.unit, &config.continuation_marker),
            Enforcement::Truncated,
        )
    };

    let length_metric = measure(&content, spec.unit);
    Enforced {
        content,
        length_metric,
        action,
    }
}

fn soft_trim(text: &str, limit: usize, unit: LengthUnit) -> String {
    let head = prefix(text, limit, unit);

    let trimmed = match unit {
        LengthUnit::Words => head,
        // Cutting mid-word looks worse than losing the partial word
        LengthUnit::Chars if head.len() < text.len() => head
            .rfind(char::is_whitespace)
            .map(|idx| &head[..idx])
            .unwrap_or(head),
        LengthUnit::Chars => head,
    };

    trimmed.trim_end().to_string()
}

fn hard_truncate(text: &str, limit: usize, unit: LengthUnit, marker: &str) -> String {
    let mut keep = limit;
    loop {
        let candidate = format!("{}{}", prefix(text, keep, unit).trim_end(), marker);
        if measure(&candidate, unit) <= limit {
            return candidate;
        }
        if keep == 0 {
            // Marker alone does not fit
            return prefix(text, limit, unit).trim_end().to_string();
        }
        keep -= 1;
    }
}

/// The leading `n` units of `text`, keeping its original spacing
fn prefix(text: &str, n: usize, unit: LengthUnit) -> &str {
    let end = match unit {
        LengthUnit::Chars => text
            .char_indices()
            .nth(n)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len()),
        LengthUnit::Words => word_end(text, n),
    };
    &text[..end]
}

/// Byte index just past the `n`th word
fn word_end(text: &str, n: usize) -> usize {
    if n == 0 {
        return 0;
    }

    let mut count = 0;
    let mut in_word = false;
    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word && count == n {
                return idx;
            }
            in_word = false;
        } else if !in_word {
            in_word = true;
            count += 1;
        }
    }

    text.len()
}
