//! Model answer vocabularies
//!
//! Classifier-style VQA models can only output labels from a fixed
//! `id -> label` table. The vocabulary is read once and never modified.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// Immutable set of canonical answer strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    labels: HashSet<String>,
}

impl Vocabulary {
    /// Build from labels; an empty vocabulary is rejected
    pub fn new<I, S>(labels: I) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: HashSet<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(AnalysisError::EmptyVocabulary);
        }
        Ok(Self { labels })
    }

    /// Build from an `id -> label` mapping (only the labels matter)
    pub fn from_id2label<K>(mapping: impl IntoIterator<Item = (K, String)>) -> AnalysisResult<Self> {
        Self::new(mapping.into_iter().map(|(_, label)| label))
    }

    /// Load from JSON
    ///
    /// Accepts either a bare `{"0": "yes", ...}` object or a model config
    /// object carrying an `id2label` field.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary: {}", path.display()))?;
        let vocabulary = Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse vocabulary: {}", path.display()))?;
        tracing::info!("Loaded vocabulary of {} labels from {}", vocabulary.len(), path.display());
        Ok(vocabulary)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        let table = match value.get("id2label") {
            Some(inner) => inner,
            None => &value,
        };
        let Value::Object(entries) = table else {
            anyhow::bail!("Vocabulary must be a JSON object of id -> label");
        };

        let mut labels = Vec::with_capacity(entries.len());
        for (id, label) in entries {
            match label {
                Value::String(s) => labels.push((id.clone(), s.clone())),
                other => anyhow::bail!("Label for id {} is not a string: {}", id, other),
            }
        }
        Ok(Self::from_id2label(labels)?)
    }

    pub fn contains(&self, answer: &str) -> bool {
        self.labels.contains(answer)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id2label() {
        let vocab = Vocabulary::from_json_str(r#"{"0": "yes", "1": "no", "2": "2", "3": "yes"}"#).unwrap();
        assert_eq!(vocab.len(), 3);
        assert!(vocab.contains("yes"));
        assert!(vocab.contains("2"));
        assert!(!vocab.contains("Yes"));
    }

    #[test]
    fn test_model_config_id2label() {
        let json = r#"{"architectures": ["ViltForQuestionAnswering"], "id2label": {"0": "net", "1": "pitcher"}}"#;
        let vocab = Vocabulary::from_json_str(json).unwrap();
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("pitcher"));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let err = Vocabulary::from_json_str("{}").unwrap_err();
        assert_eq!(err.downcast_ref::<AnalysisError>(), Some(&AnalysisError::EmptyVocabulary));
        assert_eq!(Vocabulary::new(Vec::<String>::new()), Err(AnalysisError::EmptyVocabulary));
    }

    #[test]
    fn test_non_string_label_rejected() {
        assert!(Vocabulary::from_json_str(r#"{"0": 5}"#).is_err());
        assert!(Vocabulary::from_json_str(r#"["yes", "no"]"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id2label.json");
        std::fs::write(&path, r#"{"0": "yes"}"#).unwrap();
        let vocab = Vocabulary::load(&path).unwrap();
        assert!(vocab.contains("yes"));
    }
}
