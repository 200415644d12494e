//! Model benchmarking
//!
//! Runs each configured model on questions whose images were sampled, then
//! reports latency, accuracy and answer format observations.
//!
//! ## Usage
//!
//! ```bash
//! vqa-analysis benchmark --config analysis.toml --sample-size 50
//! ```
//!
//! ## Modules
//!
//! - `matching` - Answer normalization, exact/normalized match, format observations
//! - `runner` - The per-question, per-model loop with isolated failures
//! - `timing` - Latency statistics and accuracy summaries

pub mod matching;
pub mod runner;
pub mod timing;

pub use matching::{exact_match, normalize, normalized_match, FormatObservations, VocabularyMisses};
pub use runner::{
    run_benchmark, BenchmarkRun, InferenceResult, InferenceRow, Issue, IssueKind, IssueLog, ERROR_ANSWER,
};
pub use timing::{AccuracySummary, TimingSummary};
