use super::Chunk;
use crate::stages::Topic;

const PHRASE_WEIGHT: u32 = 5;
const WORD_WEIGHT: u32 = 1;
const MIN_WORD_CHARS: usize = 4;

/// Lowercased match terms derived from a topic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTerms {
    /// Title and key points with at least two words
    pub phrases: Vec<String>,

    /// Distinct words longer than three chars from the title and key points
    pub words: Vec<String>,
}

impl KeyTerms {
    pub fn from_topic(topic: &Topic) -> Self {
        let mut terms = Self::default();

        let sources = std::iter::once(topic.title.as_str())
            .chain(topic.key_points.iter().map(String::as_str));

        for source in sources {
            let normalized = source
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();

            if normalized.split(' ').count() >= 2 && !terms.phrases.contains(&normalized) {
                terms.phrases.push(normalized.clone());
            }

            for word in normalized.split(|c: char| !c.is_alphanumeric()) {
                if word.chars().count() >= MIN_WORD_CHARS && !terms.words.iter().any(|w| w == word) {
                    terms.words.push(word.to_string());
                }
            }
        }

        terms
    }

    /// Score a piece of text against these terms
    pub fn score(&self, text: &str) -> u32 {
        let haystack = text.to_lowercase();

        let phrase_hits = self
            .phrases
            .iter()
            .filter(|phrase| haystack.contains(phrase.as_str()))
            .count() as u32;
        let word_hits = self
            .words
            .iter()
            .filter(|word| haystack.contains(word.as_str()))
            .count() as u32;

        PHRASE_WEIGHT * phrase_hits + WORD_WEIGHT * word_hits
    }
}

/// Relevance of one chunk to a topic
pub fn score(chunk: &Chunk, topic: &Topic) -> u32 {
    KeyTerms::from_topic(topic).score(&chunk.text)
}

/// Pick the `k` most relevant chunks for a topic.
///
/// Ties go to the chunk that starts earlier in the source. When nothing matches
/// at all, the first window is returned, plus the middle and last windows when
/// the source spans three or more windows.
pub fn select_best(chunks: impl IntoIterator<Item = Chunk>, topic: &Topic, k: usize) -> Vec<Chunk> {
    let terms = KeyTerms::from_topic(topic);

    let mut scored: Vec<Chunk> = chunks
        .into_iter()
        .map(|mut chunk| {
            chunk.score = Some(terms.score(&chunk.text));
            chunk
        })
        .collect();

    if scored.is_empty() {
        return scored;
    }

    if scored.iter().all(|chunk| chunk.score == Some(0)) {
        tracing::debug!(
            "No keyword matches for topic '{}', using positional windows",
            topic.title
        );
        return positional_fallback(scored);
    }

    scored.retain(|chunk| chunk.score.unwrap_or(0) > 0);
    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.start_offset.cmp(&b.start_offset))
    });
    scored.truncate(k.max(1));
    scored
}

fn positional_fallback(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    let count = chunks.len();
    if count < 3 {
        chunks.truncate(1);
        return chunks;
    }

    let last = chunks.swap_remove(count - 1);
    let middle = chunks.swap_remove(count / 2);
    let first = chunks.swap_remove(0);
    vec![first, middle, last]
}

/// Join selected chunks into one generation context, in source order
pub fn build_context(selected: &[Chunk]) -> String {
    let mut ordered: Vec<&Chunk> = selected.iter().collect();
    ordered.sort_by_key(|chunk| chunk.start_offset);

    ordered
        .iter()
        .map(|chunk| chunk.text.trim())
        .collect::<Vec<_>>()
        .join("\n...\n")
}
