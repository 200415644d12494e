//! Configuration for the VQA dataset analysis
//!
//! Defines the analysis.toml schema. Every field has a default so a partial
//! file (or no file at all) is valid.
//!
//! ```toml
//! dataset = "data/val_balanced_questions.json"
//! seed = 42
//!
//! [balance]
//! too_small = 500
//! well_represented = 5000
//!
//! [[models]]
//! name = "vilt"
//! program = "python3"
//! args = ["scripts/vilt_predict.py"]
//! vocabulary = "vocab/vilt_id2label.json"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::ModelConfig;

/// Category size thresholds for balance flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceThresholds {
    /// Categories with fewer records are flagged TOO SMALL
    #[serde(default = "default_too_small")]
    pub too_small: usize,

    /// Categories with more records are flagged WELL-REPRESENTED
    #[serde(default = "default_well_represented")]
    pub well_represented: usize,
}

impl Default for BalanceThresholds {
    fn default() -> Self {
        Self {
            too_small: default_too_small(),
            well_represented: default_well_represented(),
        }
    }
}

/// Analysis run configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// GQA questions JSON
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,

    /// Directory for CSV and JSON reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Zip archive holding the full image set
    #[serde(default = "default_image_archive")]
    pub image_archive: PathBuf,

    /// Directory of sampled `<image_id>.jpg` files
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// File listing sampled image ids, one per line
    #[serde(default = "default_image_ids")]
    pub image_ids: PathBuf,

    /// Seed for every random draw
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Images drawn from the archive
    #[serde(default = "default_image_sample_size")]
    pub image_sample_size: usize,

    /// Questions benchmarked per run
    #[serde(default = "default_question_sample_size")]
    pub question_sample_size: usize,

    /// Example questions shown per structural type
    #[serde(default = "default_examples_per_type")]
    pub examples_per_type: usize,

    /// Coverage percentage below which a category is reported
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,

    /// Number of uncovered answers listed
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Question count of the full split, for runtime extrapolation
    #[serde(default = "default_full_dataset_size")]
    pub full_dataset_size: usize,

    #[serde(default)]
    pub balance: BalanceThresholds,

    /// Models to benchmark
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

fn default_dataset() -> PathBuf { PathBuf::from("data/val_balanced_questions.json") }
fn default_output_dir() -> PathBuf { PathBuf::from("results") }
fn default_image_archive() -> PathBuf { PathBuf::from("data/images.zip") }
fn default_image_dir() -> PathBuf { PathBuf::from("data/sample_images") }
fn default_image_ids() -> PathBuf { PathBuf::from("data/sample_image_ids.txt") }
fn default_seed() -> u64 { 42 }
fn default_image_sample_size() -> usize { 100 }
fn default_question_sample_size() -> usize { 50 }
fn default_examples_per_type() -> usize { 3 }
fn default_coverage_threshold() -> f64 { 70.0 }
fn default_top_k() -> usize { 30 }
fn default_full_dataset_size() -> usize { 132_062 }
fn default_too_small() -> usize { 500 }
fn default_well_represented() -> usize { 5000 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            output_dir: default_output_dir(),
            image_archive: default_image_archive(),
            image_dir: default_image_dir(),
            image_ids: default_image_ids(),
            seed: default_seed(),
            image_sample_size: default_image_sample_size(),
            question_sample_size: default_question_sample_size(),
            examples_per_type: default_examples_per_type(),
            coverage_threshold: default_coverage_threshold(),
            top_k: default_top_k(),
            full_dataset_size: default_full_dataset_size(),
            balance: BalanceThresholds::default(),
            models: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis config: {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse analysis config: {:?}", path))?;
        Ok(config)
    }

    /// Load from default location (./analysis.toml) or return defaults
    pub fn load_default() -> Result<Self> {
        let local_path = Path::new("analysis.toml");
        if local_path.exists() {
            return Self::load(local_path);
        }
        Ok(Self::default())
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write analysis config: {:?}", path))?;
        Ok(())
    }

    /// Path of a report file inside the output directory
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.image_sample_size, 100);
        assert_eq!(config.question_sample_size, 50);
        assert_eq!(config.top_k, 30);
        assert_eq!(config.full_dataset_size, 132_062);
        assert_eq!(config.balance, BalanceThresholds { too_small: 500, well_represented: 5000 });
        assert!((config.coverage_threshold - 70.0).abs() < 0.001);
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
dataset = "gqa/testdev_balanced_questions.json"
seed = 7

[balance]
too_small = 100
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dataset, PathBuf::from("gqa/testdev_balanced_questions.json"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.balance.too_small, 100);
        assert_eq!(config.balance.well_represented, 5000);
        assert_eq!(config.examples_per_type, 3);
    }

    #[test]
    fn test_models_toml() {
        let toml_str = r#"
[[models]]
name = "blip"
program = "python3"
args = ["scripts/blip_predict.py"]

[[models]]
name = "vilt"
program = "python3"
args = ["scripts/vilt_predict.py"]
vocabulary = "vocab/vilt_id2label.json"
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].name, "blip");
        assert!(config.models[0].vocabulary.is_none());
        assert!(config.models[1].vocabulary.is_some());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        let mut config = AnalysisConfig::default();
        config.seed = 1234;
        config.models.push(ModelConfig::new("blip", "python3").with_args(vec!["blip.py"]));
        config.save(&path).unwrap();

        let loaded = AnalysisConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_output_path() {
        let config = AnalysisConfig::default();
        assert_eq!(config.output_path("coverage.csv"), PathBuf::from("results/coverage.csv"));
    }
}
