//! Deterministic transcript cleanup applied before the refine call

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[(]\d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?[\])]").unwrap());

static BARE_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}:\d{2}(?:\.\d+)?\b").unwrap());

static SPEAKER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\[(]\s*speaker\s*(\d+)\s*[\])]:?").unwrap());

static FILLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:u+m+|u+h+|erm|you\s+know|i\s+mean)\b,?").unwrap()
});

static MISSING_SPACE_AFTER_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(\p{Lu})").unwrap());

static MISSING_SPACE_AFTER_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\p{L})").unwrap());

static REPEATED_PERIODS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

static SENTENCE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|[.!?]+\s+)(\p{Ll})").unwrap());

static FIRST_PERSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bi\b").unwrap());

static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+([,.!?])").unwrap());

static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n(?:\s*\n)*").unwrap());

/// Remove `[MM:SS]`, `(MM:SS)` and `HH:MM:SS` markers
pub fn strip_timestamps(text: &str) -> String {
    let text = BRACKETED_TIMESTAMP.replace_all(text, "");
    BARE_TIMESTAMP.replace_all(&text, "").into_owned()
}

/// Rewrite `[Speaker 1]` / `(speaker 2)` as `Speaker 1:`
pub fn standardize_speaker_labels(text: &str) -> String {
    SPEAKER_LABEL.replace_all(text, "Speaker $1:").into_owned()
}

/// Drop hesitation sounds and verbal fillers ("um", "uh", "you know", "i mean")
pub fn remove_filler_words(text: &str) -> String {
    FILLER.replace_all(text, "").into_owned()
}

/// Space out run-together sentences and clauses, collapse `....` to `...`
pub fn fix_punctuation(text: &str) -> String {
    let text = REPEATED_PERIODS.replace_all(text, "...");
    let text = MISSING_SPACE_AFTER_PERIOD.replace_all(&text, ". $1");
    MISSING_SPACE_AFTER_COMMA
        .replace_all(&text, ", $1")
        .into_owned()
}

/// Capitalize sentence starts and the standalone pronoun "i"
pub fn fix_capitalization(text: &str) -> String {
    let text = SENTENCE_START.replace_all(text, |caps: &regex::Captures| {
        format!("{}{}", &caps[1], caps[2].to_uppercase())
    });
    FIRST_PERSON.replace_all(&text, "I").into_owned()
}

/// Collapse runs of spaces, keep paragraph breaks
pub fn normalize_whitespace(text: &str) -> String {
    let text = INLINE_SPACE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = BLANK_LINES.replace_all(&text, "\n\n");

    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Full cleanup pass
pub fn clean_transcript(text: &str) -> String {
    let text = strip_timestamps(text);
    let text = standardize_speaker_labels(&text);
    let text = remove_filler_words(&text);
    let text = fix_punctuation(&text);
    fix_capitalization(&normalize_whitespace(&text))
}
