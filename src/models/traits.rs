//! VQA model trait abstraction
//!
//! Defines a common interface for every model taking part in the benchmark.
//! Models are black boxes: the runner hands over an image and a question and
//! measures latency itself.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::vocabulary::Vocabulary;

/// Configuration of one benchmarked model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Human-readable name used in reports (e.g. "blip", "vilt")
    pub name: String,

    /// Program to run for each prediction
    pub program: String,

    /// Arguments placed before the image path and question
    #[serde(default)]
    pub args: Vec<String>,

    /// Answer vocabulary (JSON id2label) for classifier-style models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<PathBuf>,

    /// Additional notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            vocabulary: None,
            notes: None,
        }
    }

    pub fn with_args(mut self, args: Vec<&str>) -> Self {
        self.args = args.into_iter().map(String::from).collect();
        self
    }

    pub fn with_vocabulary(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocabulary = Some(path.into());
        self
    }
}

/// Unified trait for VQA models
///
/// Implementations may fail on any call; the benchmark runner isolates
/// failures per record and keeps going.
pub trait VqaModel {
    /// Get the configuration for this model
    fn config(&self) -> &ModelConfig;

    /// Get the name of this model
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Answer `question` about the image at `image`
    fn predict(&self, image: &Path, question: &str) -> Result<String>;

    /// Fixed answer vocabulary, for classifier-style models
    fn vocabulary(&self) -> Option<&Vocabulary> {
        None
    }
}

/// Helper to measure duration of a sync operation
pub fn measure_sync<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();
    (result, duration)
}
