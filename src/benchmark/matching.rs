//! Answer normalization and matching
//!
//! Two comparison modes are reported side by side:
//! - exact: trimmed, case-insensitive string equality
//! - normalized: additionally maps number words to digits and drops a
//!   leading article
//!
//! ## Normalization
//!
//! 1. trim and lowercase
//! 2. whole-string number words `zero`..`ten` become digits
//! 3. one leading `a `, `an ` or `the ` is removed
//!
//! Each step runs once. Stacked articles (`"the the cat"`) or an article
//! before a number word (`"the one"`) therefore keep changing under a second
//! call; every other answer is a fixed point after one call.

use serde::Serialize;

use crate::models::Vocabulary;

const NUMBER_WORDS: [(&str, &str); 11] = [
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
];

const ARTICLES: [&str; 3] = ["a ", "an ", "the "];

/// Canonical form of an answer for lenient comparison
pub fn normalize(answer: &str) -> String {
    let s = answer.trim().to_lowercase();
    let s = match NUMBER_WORDS.iter().find(|(word, _)| *word == s) {
        Some((_, digits)) => (*digits).to_string(),
        None => s,
    };
    match ARTICLES.iter().find_map(|article| s.strip_prefix(article)) {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

/// Trimmed, case-insensitive equality
pub fn exact_match(predicted: &str, expected: &str) -> bool {
    predicted.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Equality after normalizing both sides
pub fn normalized_match(predicted: &str, expected: &str) -> bool {
    normalize(predicted) == normalize(expected)
}

fn is_multi_word(answer: &str) -> bool {
    answer.split_whitespace().nth(1).is_some()
}

/// Wrong answers of a vocabulary-bound model, split by whether the ground
/// truth was reachable at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VocabularyMisses {
    pub wrong: usize,
    /// Ground truth is a label: the model chose wrongly
    pub in_vocabulary: usize,
    /// Ground truth is not a label: no output could have matched
    pub not_in_vocabulary: usize,
}

/// Answer format observations for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatObservations {
    pub model: String,
    pub total: usize,
    /// Answers equal to the ground truth only when case is ignored
    pub case_only_mismatches: usize,
    pub multi_word_predictions: usize,
    pub multi_word_ground_truths: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_misses: Option<VocabularyMisses>,
}

impl FormatObservations {
    /// Compute from `(predicted, ground_truth)` pairs
    pub fn compute<'a, I>(model: &str, pairs: I, vocabulary: Option<&Vocabulary>) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut observations = Self {
            model: model.to_string(),
            total: 0,
            case_only_mismatches: 0,
            multi_word_predictions: 0,
            multi_word_ground_truths: 0,
            vocabulary_misses: vocabulary.map(|_| VocabularyMisses {
                wrong: 0,
                in_vocabulary: 0,
                not_in_vocabulary: 0,
            }),
        };

        for (predicted, expected) in pairs {
            observations.total += 1;
            let matched = exact_match(predicted, expected);
            if matched && predicted.trim() != expected.trim() {
                observations.case_only_mismatches += 1;
            }
            if is_multi_word(predicted) {
                observations.multi_word_predictions += 1;
            }
            if is_multi_word(expected) {
                observations.multi_word_ground_truths += 1;
            }
            if let (Some(vocab), Some(misses)) = (vocabulary, observations.vocabulary_misses.as_mut()) {
                if !matched {
                    misses.wrong += 1;
                    if vocab.contains(expected) {
                        misses.in_vocabulary += 1;
                    } else {
                        misses.not_in_vocabulary += 1;
                    }
                }
            }
        }

        observations
    }

    /// Format as a summary string
    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "case-only: {} | multi-word: {}/{} (gt: {}/{})",
            self.case_only_mismatches,
            self.multi_word_predictions,
            self.total,
            self.multi_word_ground_truths,
            self.total
        );
        if let Some(misses) = &self.vocabulary_misses {
            summary.push_str(&format!(
                " | wrong: {} (gt in vocab: {}, not in vocab: {})",
                misses.wrong, misses.in_vocabulary, misses.not_in_vocabulary
            ));
        }
        summary
    }
}
