//! Keyword scoring shared by predicate discovery and observation parsing.

use indexmap::IndexMap;

/// Count how many `keywords` occur in `text`, case-insensitively.
///
/// Each keyword counts at most once regardless of how often it occurs.
/// Keywords are expected in lowercase.
pub fn keyword_score(text: &str, keywords: &[String]) -> usize {
    let lower = text.to_lowercase();
    keywords.iter().filter(|k| lower.contains(k.as_str())).count()
}

/// Whether any of `keywords` occurs in `text`, case-insensitively.
pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    keyword_score(text, keywords) > 0
}

/// Accumulated scores per key, remembering first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    scores: IndexMap<String, u32>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `points` to `key`, inserting it at the end if unseen.
    pub fn award(&mut self, key: &str, points: u32) {
        match self.scores.get_mut(key) {
            Some(score) => *score += points,
            None => {
                self.scores.insert(key.to_string(), points);
            }
        }
    }

    /// The key with the strictly highest score; ties go to the key seen first.
    pub fn best(&self) -> Option<(&str, u32)> {
        let mut best: Option<(&str, u32)> = None;
        for (key, &score) in &self.scores {
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((key.as_str(), score));
            }
        }
        best
    }

    pub fn score(&self, key: &str) -> Option<u32> {
        self.scores.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Lowercase owned keyword list from string literals.
pub(crate) fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
