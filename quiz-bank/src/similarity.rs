//! Near-duplicate detection over question texts.
//!
//! Scores are Dice coefficients over character bigram multisets, with all
//! whitespace removed first. Comparison is case-sensitive and symmetric.
//! Checking a candidate is O(corpus size); corpora are scoped per category.

/// Score above which two texts are considered the same question.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.85;

/// Dice coefficient of the bigram multisets of `a` and `b`, in `[0.0, 1.0]`.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(a, b)
}

/// A corpus entry that scored above the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    /// The stored text that matched
    pub text: String,
    /// Similarity score (0.0 - 1.0)
    pub score: f64,
}

/// Flags candidates too similar to anything already in a corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateDetector {
    threshold: f64,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_DUPLICATE_THRESHOLD)
    }
}

impl DuplicateDetector {
    /// Create with a custom threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Get detector threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `text` scores above the threshold against any corpus entry.
    pub fn is_duplicate<I, S>(&self, text: &str, corpus: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.find_duplicate(text, corpus).is_some()
    }

    /// First corpus entry scoring above the threshold.
    pub fn find_duplicate<I, S>(&self, text: &str, corpus: I) -> Option<SimilarityMatch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        corpus.into_iter().find_map(|existing| {
            let score = dice_coefficient(existing.as_ref(), text);
            (score > self.threshold).then(|| SimilarityMatch {
                text: existing.as_ref().to_string(),
                score,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACE: &str = "Which enzyme converts angiotensin I to angiotensin II in the lungs?";

    #[test]
    fn test_identical_texts_score_one() {
        assert_eq!(dice_coefficient(ACE, ACE), 1.0);
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let spaced = "Which enzyme  converts angiotensin I to angiotensin II in the lungs ?";
        assert_eq!(dice_coefficient(ACE, spaced), 1.0);
    }

    #[test]
    fn test_punctuation_variant_is_duplicate() {
        let variant = "Which enzyme converts angiotensin I to angiotensin II, in the lungs.";
        let score = dice_coefficient(ACE, variant);
        assert!(score > DEFAULT_DUPLICATE_THRESHOLD, "score was {score}");
        assert!(DuplicateDetector::default().is_duplicate(variant, [ACE]));
    }

    #[test]
    fn test_unrelated_texts_are_distinct() {
        let other = "Which article of the Constitution deals with the Finance Commission?";
        let score = dice_coefficient(ACE, other);
        assert!(score < DEFAULT_DUPLICATE_THRESHOLD, "score was {score}");
        assert!(!DuplicateDetector::default().is_duplicate(other, [ACE]));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(dice_coefficient("abcdef", "ABCDEF") < 0.01);
    }

    #[test]
    fn test_short_strings() {
        assert_eq!(dice_coefficient("a", "b"), 0.0);
        assert_eq!(dice_coefficient("a", "a"), 1.0);
        assert_eq!(dice_coefficient("", "ab"), 0.0);
    }

    #[test]
    fn test_repeated_bigrams_counted_as_multiset() {
        // "aaaa" has bigrams {aa x3}; "aa" has {aa x1}: 2*1 / (3+1)
        assert!((dice_coefficient("aaaa", "aa") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_known_scores() {
        assert!((dice_coefficient("night", "nacht") - 0.25).abs() < f64::EPSILON);
        assert!((dice_coefficient("feris", "ferris") - 8.0 / 9.0).abs() < 1e-12);
        assert_eq!(dice_coefficient("french", "quebec"), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            (ACE, "Which enzyme converts angiotensin I?"),
            ("night", "nacht"),
            ("Define federalism.", "Define fiscal federalism in India."),
        ];
        let detector = DuplicateDetector::with_threshold(0.3);
        for (a, b) in pairs {
            assert_eq!(dice_coefficient(a, b), dice_coefficient(b, a));
            assert_eq!(detector.is_duplicate(a, [b]), detector.is_duplicate(b, [a]));
        }
    }

    #[test]
    fn test_find_duplicate_reports_match() {
        let corpus = vec![
            "What is the capital of India?".to_string(),
            ACE.to_string(),
        ];
        let found = DuplicateDetector::default()
            .find_duplicate(ACE, &corpus)
            .unwrap();
        assert_eq!(found.text, ACE);
        assert_eq!(found.score, 1.0);
    }

    #[test]
    fn test_empty_corpus_never_duplicate() {
        let corpus: Vec<String> = Vec::new();
        assert!(!DuplicateDetector::default().is_duplicate(ACE, &corpus));
    }
}
