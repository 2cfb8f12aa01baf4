//! Text helpers shared by processors, analyzers and the search index

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Minimum length of an indexable term
pub const MIN_TERM_LEN: usize = 3;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
        "her", "his", "in", "into", "is", "it", "its", "of", "on", "or", "she", "that", "the",
        "their", "them", "they", "this", "to", "was", "were", "when", "where", "which", "who",
        "will", "with", "after", "before", "about", "while", "must", "one", "two", "all", "can",
        "not", "out", "what", "him", "there", "been", "being", "also", "than", "then", "over",
        "under", "between", "through", "during", "only", "own", "same", "some", "such", "more",
        "most", "other", "new", "film", "movie", "story",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Lowercase, replace punctuation with spaces and collapse whitespace
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Lowercase word tokens, in order, duplicates kept
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Tokens worth indexing: stop words and short tokens removed, first occurrence order
pub fn content_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_TERM_LEN && !is_stop_word(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Jaccard overlap of two token sets
pub fn jaccard<'a>(a: impl IntoIterator<Item = &'a str>, b: impl IntoIterator<Item = &'a str>) -> f64 {
    let a: HashSet<&str> = a.into_iter().collect();
    let b: HashSet<&str> = b.into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    shared as f64 / union as f64
}
