//! Error taxonomy for dataset analysis and benchmarking
//!
//! Per-record failures (`MissingResource`, `PredictionFailure`) are recorded
//! in the benchmark issue log and never abort a run. Structural failures
//! (`MalformedRecord`, `EmptyVocabulary`) invalidate every downstream
//! computation and are propagated to the caller.

use thiserror::Error;

/// Errors raised by the analysis library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A dataset entry is missing a required field or has an invalid value
    #[error("Malformed record '{id}': {reason}")]
    MalformedRecord { id: String, reason: String },

    /// Vocabulary source produced no labels
    #[error("Vocabulary is empty")]
    EmptyVocabulary,

    /// Percentage requested over an empty pool of records
    #[error("Percentage undefined: pool is empty")]
    EmptyPool,

    /// Coverage requested for a category that has no records
    #[error("Coverage undefined: category '{category}' has no records")]
    EmptyCategory { category: String },

    /// Covered count exceeds the category total
    #[error("Invalid coverage for '{category}': covered {covered} > total {total}")]
    InvalidCoverage {
        category: String,
        covered: usize,
        total: usize,
    },

    /// An expected external resource (e.g. an image file) is absent
    #[error("Missing resource: {resource}")]
    MissingResource { resource: String },

    /// A model call failed for one record
    #[error("{model} error on {id}: {reason}")]
    PredictionFailure {
        model: String,
        id: String,
        reason: String,
    },
}

/// Library result type
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::EmptyCategory {
            category: "compare".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Coverage undefined: category 'compare' has no records"
        );

        let err = AnalysisError::PredictionFailure {
            model: "blip".to_string(),
            id: "q2".to_string(),
            reason: "CUDA out of memory".to_string(),
        };
        assert_eq!(err.to_string(), "blip error on q2: CUDA out of memory");
    }
}
