//! Sentence Unit splitting for speech synthesis.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("sentence boundary regex is valid"));

/// Split a response into trimmed, non-empty sentences.
///
/// A boundary is `.`, `?` or `!` followed by whitespace; the punctuation
/// stays with the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(text) {
        // The terminator is one ASCII byte.
        let end = boundary.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let segment = segment.trim();
    if !segment.is_empty() {
        out.push(segment.to_string());
    }
}
