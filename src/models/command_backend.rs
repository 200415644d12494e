//! External-command model backend
//!
//! Runs a configured program once per prediction:
//!
//! ```text
//! <program> <args...> <image_path> <question>
//! ```
//!
//! The answer is the trimmed standard output. A non-zero exit status or an
//! empty answer is a prediction failure.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

use super::traits::{ModelConfig, VqaModel};
use super::vocabulary::Vocabulary;

/// A model served by an external predictor process
#[derive(Debug, Clone)]
pub struct CommandModel {
    config: ModelConfig,
    vocabulary: Option<Vocabulary>,
}

impl CommandModel {
    /// Create the model, loading its vocabulary if one is configured
    pub fn new(config: ModelConfig) -> Result<Self> {
        let vocabulary = match &config.vocabulary {
            Some(path) => Some(
                Vocabulary::load(path)
                    .with_context(|| format!("Failed to load vocabulary for model '{}'", config.name))?,
            ),
            None => None,
        };
        Ok(Self { config, vocabulary })
    }

    fn build_command(&self, image: &Path, question: &str) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args).arg(image).arg(question);
        command
    }
}

impl VqaModel for CommandModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn predict(&self, image: &Path, question: &str) -> Result<String> {
        let output = self
            .build_command(image, question)
            .output()
            .with_context(|| format!("Failed to execute {}", self.config.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            );
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if answer.is_empty() {
            anyhow::bail!("{} produced an empty answer", self.config.program);
        }
        Ok(answer)
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }
}
