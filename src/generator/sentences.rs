use std::sync::LazyLock;

use regex::Regex;

pub const MIN_SENTENCE_CHARS: usize = 40;
pub const MAX_CANDIDATES: usize = 40;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence pattern compiles"));

/// Collapse every run of whitespace (including line breaks) to one space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on terminal punctuation followed by whitespace. The punctuation
/// stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(&normalized) {
        // The matched punctuation is a single ASCII byte.
        let end = m.start() + 1;
        let sentence = normalized[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let tail = normalized[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

fn is_candidate(sentence: &str) -> bool {
    sentence.chars().count() > MIN_SENTENCE_CHARS && sentence.chars().any(char::is_alphabetic)
}

/// Sentences worth drafting from, in document order, at most `limit`
/// (never more than `MAX_CANDIDATES`).
pub fn candidate_sentences(text: &str, limit: usize) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter(|s| is_candidate(s))
        .take(limit.min(MAX_CANDIDATES))
        .collect()
}
