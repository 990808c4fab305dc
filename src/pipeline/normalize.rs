//! Text normalization ahead of classification.
//!
//! NFKC → lowercase → character filter → tokenize → drop stopwords →
//! Portuguese Snowball stem → join with single spaces.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

use super::stopwords;

/// Accented letters kept by the character filter.
const ACCENTED: &str = "áéíóúãõâêîôûçàèìòùü";

/// Punctuation kept by the character filter.
const PUNCTUATION: &str = ".,;:!?()-";

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_áéíóúãõâêîôûçàèìòùü]+").expect("static regex is valid")
});

/// Normalizes email text into a space-separated string of stemmed tokens.
///
/// Built once at startup; holds only read-only state.
pub struct TextNormalizer {
    stopwords: &'static HashSet<&'static str>,
    stemmer: Stemmer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            stopwords: stopwords::portuguese(),
            stemmer: Stemmer::create(Algorithm::Portuguese),
        }
    }

    /// Run the full normalization. Never fails; may return an empty string.
    pub fn normalize(&self, text: &str) -> String {
        let folded = fold_case(text);
        let filtered = filter_characters(&folded);
        let tokens = tokenize(&filtered);
        self.reduce_tokens(tokens).join(" ")
    }

    /// Stopword removal followed by stemming.
    ///
    /// A stem that is itself a stopword (`comer` → `com`) is dropped too, so
    /// the output holds no stopwords and reducing it again changes nothing.
    pub fn reduce_tokens<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|t| !self.stopwords.contains(t))
            .map(|t| self.stem(t))
            .filter(|stem| !self.stopwords.contains(stem.as_str()))
            .collect()
    }

    /// Stem until the token stops changing.
    ///
    /// A single Snowball pass is not always a fixed point (a stripped verb
    /// ending can expose a residual vowel). A pass never lengthens the token
    /// and the only same-length rewrite (`ç` → `c`) cannot repeat.
    pub fn stem(&self, token: &str) -> String {
        let mut current = token.to_string();
        loop {
            let next = self.stemmer.stem(&current);
            if next == current.as_str() {
                return current;
            }
            current = next.into_owned();
        }
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// NFKC followed by lowercasing.
pub fn fold_case(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized.to_lowercase()
}

/// Replace every character outside the kept classes with a single space.
pub fn filter_characters(text: &str) -> String {
    text.chars()
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect()
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || ACCENTED.contains(c)
        || PUNCTUATION.contains(c)
}

/// Split on runs of non-word characters, dropping empty tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    NON_WORD.split(text).filter(|t| !t.is_empty()).collect()
}
