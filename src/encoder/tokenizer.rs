//! Tokenization of reconstruction hints into the unigram/bigram token
//! set that feeds the co-occurrence matrix and contextual vectors.

use std::collections::BTreeSet;

use crate::core::Hint;

/// Hint keys whose string values are pulled into the tokenizer's input
/// text. Not exhaustive by design — the hint is open-ended JSON, and
/// any future caller can add a recognized key without breaking
/// existing traces.
const RECOGNIZED_KEYS: &[&str] = &[
    "content",
    "summary",
    "event",
    "key_events",
    "subject",
    "object",
];

/// Fixed, small stopword list. Technical terms are never in it.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "was", "were", "are", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "can", "shall", "of",
    "to", "in", "for", "on", "with", "at", "by", "from", "that", "this", "it", "its", "and", "or",
    "but", "not", "no", "if", "then", "than", "so", "as", "into",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Collect every string value under a recognized key, label-prefixed
/// with the key. `key_events` may be an array of strings; each element
/// is taken separately.
fn extract_labeled_strings(hint: &Hint) -> Vec<String> {
    let mut out = Vec::new();
    for key in RECOGNIZED_KEYS {
        let Some(value) = hint.get(*key) else {
            continue;
        };
        match value {
            serde_json::Value::String(s) => out.push(format!("{key} {s}")),
            serde_json::Value::Array(items) => {
                for item in items {
                    if let serde_json::Value::String(s) = item {
                        out.push(format!("{key} {s}"));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Lowercase, replace punctuation (other than underscore/hyphen within
/// a word) with spaces, and split on whitespace.
fn normalize_and_split(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned
        .split_whitespace()
        .map(std::string::ToString::to_string)
        .collect()
}

/// Tokenize a reconstruction hint into the union of unigrams and
/// bigrams. Drops stopwords and tokens shorter than two characters
/// before bigram joining, per spec.
#[must_use]
pub fn tokenize(hint: &Hint) -> BTreeSet<String> {
    let labeled = extract_labeled_strings(hint);
    let mut unigrams = Vec::new();
    for text in &labeled {
        for word in normalize_and_split(text) {
            if word.len() >= 2 && !is_stopword(&word) {
                unigrams.push(word);
            }
        }
    }

    let mut tokens: BTreeSet<String> = unigrams.iter().cloned().collect();
    for pair in unigrams.windows(2) {
        tokens.insert(format!("{}_{}", pair[0], pair[1]));
    }
    tokens
}

/// Lowercase + stopword-strip a raw string, with no hint/field-label
/// structure and no bigram step — used by the brain's thought process
/// and distiller, which work over free text rather than hints.
#[must_use]
pub fn extract_terms(text: &str) -> Vec<String> {
    normalize_and_split(text)
        .into_iter()
        .filter(|word| word.len() >= 2 && !is_stopword(word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(pairs: &[(&str, &str)]) -> Hint {
        let mut h = Hint::new();
        for (k, v) in pairs {
            h.insert((*k).to_string(), serde_json::json!(v));
        }
        h
    }

    #[test]
    fn extracts_and_lowercases_recognized_fields() {
        let h = hint(&[("content", "Hello World")]);
        let tokens = tokenize(&h);
        assert!(tokens.contains("hello"));
        assert!(tokens.contains("world"));
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let h = hint(&[("content", "the a is of to")]);
        let tokens = tokenize(&h);
        assert!(tokens.is_empty());
    }

    #[test]
    fn produces_bigrams_for_adjacent_unigrams() {
        let h = hint(&[("content", "supervision tree")]);
        let tokens = tokenize(&h);
        assert!(tokens.contains("supervision"));
        assert!(tokens.contains("tree"));
        assert!(tokens.contains("supervision_tree"));
    }

    #[test]
    fn punctuation_is_replaced_with_spaces() {
        let h = hint(&[("content", "hello, world!")]);
        let tokens = tokenize(&h);
        assert!(tokens.contains("hello"));
        assert!(tokens.contains("world"));
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        let h = hint(&[("irrelevant", "should not appear")]);
        let tokens = tokenize(&h);
        assert!(tokens.is_empty());
    }

    #[test]
    fn underscore_and_hyphen_preserved_within_words() {
        let h = hint(&[("content", "black_hole_entropy cross-silo")]);
        let tokens = tokenize(&h);
        assert!(tokens.contains("black_hole_entropy"));
        assert!(tokens.contains("cross-silo"));
    }
}
