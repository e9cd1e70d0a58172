//! Lexical similarity over procurement item descriptions
//!
//! Pure text comparison with no I/O: normalization, Levenshtein distance,
//! token-set Jaccard, term-frequency cosine, and a weighted composite used
//! to rank candidate matches. All scores land in [0, 1].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::lexicon::Lexicon;

/// Canonical text form: lowercase, diacritics stripped (NFD, combining
/// marks dropped), punctuation collapsed to single spaces, trimmed.
/// Idempotent.
pub fn normalize(text: &str) -> String {
    use unicode_normalization::char::is_combining_mark;
    use unicode_normalization::UnicodeNormalization;

    let mut out = String::with_capacity(text.len());
    for ch in text.nfd().filter(|c| !is_combining_mark(*c)) {
        for lower in ch.to_lowercase() {
            if lower.is_alphanumeric() {
                out.push(lower);
            } else {
                out.push(' ');
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance over Unicode scalar values
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Per-component weights for the composite score
///
/// The composite is the weighted mean of the three components, so any
/// non-negative weights keep it in [0, 1]. The defaults make it equal to
/// the plain weighted sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub token_overlap: f64,
    pub cosine: f64,
    pub edit: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self { token_overlap: 0.4, cosine: 0.4, edit: 0.2 }
    }
}

impl SimilarityWeights {
    pub fn new(token_overlap: f64, cosine: f64, edit: f64) -> Result<Self, SimilarityError> {
        for (name, value) in [("token_overlap", token_overlap), ("cosine", cosine), ("edit", edit)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimilarityError::InvalidWeights(format!(
                    "{} must be a non-negative finite number, got {}",
                    name, value
                )));
            }
        }
        Ok(Self { token_overlap, cosine, edit })
    }

    fn combine(&self, breakdown: &ScoreBreakdown) -> f64 {
        let weight_sum = self.token_overlap + self.cosine + self.edit;
        if weight_sum <= f64::EPSILON {
            return 0.0;
        }
        (self.token_overlap * breakdown.token_overlap
            + self.cosine * breakdown.cosine
            + self.edit * breakdown.edit)
            / weight_sum
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("invalid similarity weights: {0}")]
    InvalidWeights(String),
}

/// Component scores behind a composite, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub token_overlap: f64,
    pub cosine: f64,
    pub edit: f64,
}

/// One ranked candidate out of `find_similar`
#[derive(Debug, Clone)]
pub struct SimilarityMatch<'a, T> {
    pub candidate: &'a T,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Selection knobs for `find_similar`
#[derive(Debug, Clone, Copy)]
pub struct FindOptions {
    /// Minimum composite score to keep a candidate
    pub threshold: f64,
    pub max_results: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self { threshold: 0.7, max_results: 10 }
    }
}

/// Weighted comparison of normalized descriptions against a word-list
/// configuration. Cheap to clone and share.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    weights: SimilarityWeights,
    lexicon: Arc<Lexicon>,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(SimilarityWeights::default(), Lexicon::shared())
    }
}

impl SimilarityEngine {
    pub fn new(weights: SimilarityWeights, lexicon: Arc<Lexicon>) -> Self {
        Self { weights, lexicon }
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    /// Jaccard overlap of the filtered token sets. Both sides empty after
    /// filtering scores 1.0, exactly one empty scores 0.0.
    pub fn token_overlap(&self, a: &str, b: &str) -> f64 {
        self.token_overlap_normalized(&normalize(a), &normalize(b))
    }

    /// Term-frequency cosine over the filtered tokens, same empty rules
    /// as `token_overlap`
    pub fn cosine_overlap(&self, a: &str, b: &str) -> f64 {
        self.cosine_overlap_normalized(&normalize(a), &normalize(b))
    }

    /// Weighted mean of token overlap, cosine and edit similarity
    pub fn composite_score(&self, a: &str, b: &str) -> f64 {
        self.weights.combine(&self.breakdown_normalized(&normalize(a), &normalize(b)))
    }

    /// Rank `candidates` against `query` by composite score, keeping those
    /// at or above the threshold, best first, truncated to `max_results`.
    /// Empty queries and candidates with empty normalized descriptions
    /// match nothing.
    pub fn find_similar<'a, T, F>(
        &self,
        query: &str,
        candidates: &'a [T],
        describe: F,
        options: &FindOptions,
    ) -> Vec<SimilarityMatch<'a, T>>
    where
        F: Fn(&T) -> &str,
    {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for candidate in candidates {
            let description = normalize(describe(candidate));
            if description.is_empty() {
                continue;
            }
            let breakdown = self.breakdown_normalized(&query, &description);
            let score = self.weights.combine(&breakdown);
            if score >= options.threshold {
                matches.push(SimilarityMatch { candidate, score, breakdown });
            }
        }
        matches.sort_by(|x, y| y.score.total_cmp(&x.score));
        matches.truncate(options.max_results);
        matches
    }

    fn breakdown_normalized(&self, a: &str, b: &str) -> ScoreBreakdown {
        ScoreBreakdown {
            token_overlap: self.token_overlap_normalized(a, b),
            cosine: self.cosine_overlap_normalized(a, b),
            edit: edit_similarity(a, b),
        }
    }

    fn token_overlap_normalized(&self, a: &str, b: &str) -> f64 {
        let set_a: HashSet<&str> = self.filtered_tokens(a).into_iter().collect();
        let set_b: HashSet<&str> = self.filtered_tokens(b).into_iter().collect();
        match (set_a.is_empty(), set_b.is_empty()) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            (false, false) => {
                let intersection = set_a.intersection(&set_b).count();
                let union = set_a.union(&set_b).count();
                intersection as f64 / union as f64
            }
        }
    }

    fn cosine_overlap_normalized(&self, a: &str, b: &str) -> f64 {
        let tf_a = self.term_frequencies(a);
        let tf_b = self.term_frequencies(b);
        match (tf_a.is_empty(), tf_b.is_empty()) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            (false, false) => {
                let dot: f64 = tf_a
                    .iter()
                    .filter_map(|(token, count_a)| tf_b.get(token).map(|count_b| count_a * count_b))
                    .sum();
                let norm_a: f64 = tf_a.values().map(|c| c * c).sum::<f64>().sqrt();
                let norm_b: f64 = tf_b.values().map(|c| c * c).sum::<f64>().sqrt();
                dot / (norm_a * norm_b)
            }
        }
    }

    fn filtered_tokens<'t>(&self, normalized: &'t str) -> Vec<&'t str> {
        normalized
            .split_whitespace()
            .filter(|token| token.chars().count() > 2 && !self.lexicon.is_stop_word(token))
            .collect()
    }

    fn term_frequencies<'t>(&self, normalized: &'t str) -> HashMap<&'t str, f64> {
        let mut frequencies = HashMap::new();
        for token in self.filtered_tokens(normalized) {
            *frequencies.entry(token).or_insert(0.0) += 1.0;
        }
        frequencies
    }
}

/// Edit distance converted to a similarity in [0, 1], both empty
/// scoring 1.0
fn edit_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
