//! GQA-style question dataset
//!
//! Loads question records with ground-truth answers and validates them up
//! front, so every downstream computation works on typed records.
//!
//! ## Dataset File Format (JSON)
//!
//! The file is an object keyed by question id. Key order is preserved.
//!
//! ```json
//! {
//!   "201307251": {
//!     "question": "Is the sky blue?",
//!     "answer": "yes",
//!     "imageId": "n161313",
//!     "types": { "structural": "verify", "semantic": "attr", "detailed": "..." }
//!   }
//! }
//! ```
//!
//! Unknown fields are ignored. A missing `question`, `answer`, `imageId` or
//! `types` field, or an unknown structural/semantic type, rejects the whole
//! file with [`AnalysisError::MalformedRecord`].

pub mod sampling;

pub use sampling::{sample, select_benchmark_questions};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// Prefix identifying counting questions
pub const COUNTING_PREFIX: &str = "how many";

/// Coarse question category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralType {
    Verify,
    Query,
    Choose,
    Logical,
    Compare,
}

impl StructuralType {
    pub const ALL: [StructuralType; 5] = [
        Self::Verify,
        Self::Query,
        Self::Choose,
        Self::Logical,
        Self::Compare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Query => "query",
            Self::Choose => "choose",
            Self::Logical => "logical",
            Self::Compare => "compare",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "verify" => Some(Self::Verify),
            "query" => Some(Self::Query),
            "choose" => Some(Self::Choose),
            "logical" => Some(Self::Logical),
            "compare" => Some(Self::Compare),
            _ => None,
        }
    }
}

impl fmt::Display for StructuralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fine-grained content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Relation
    Rel,
    /// Attribute
    Attr,
    /// Object
    Obj,
    /// Category
    Cat,
    Global,
}

impl SemanticType {
    pub const ALL: [SemanticType; 5] = [Self::Rel, Self::Attr, Self::Obj, Self::Cat, Self::Global];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rel => "rel",
            Self::Attr => "attr",
            Self::Obj => "obj",
            Self::Cat => "cat",
            Self::Global => "global",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rel" => Some(Self::Rel),
            "attr" => Some(Self::Attr),
            "obj" => Some(Self::Obj),
            "cat" => Some(Self::Cat),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural and semantic labels of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionTypes {
    pub structural: StructuralType,
    pub semantic: SemanticType,
}

/// One dataset entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Question id (unique key in the dataset file)
    pub id: String,
    /// Question text
    pub question: String,
    /// Ground-truth answer
    pub answer: String,
    /// Image the question is about
    pub image_id: String,
    pub types: QuestionTypes,
}

impl QuestionRecord {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        image_id: impl Into<String>,
        structural: StructuralType,
        semantic: SemanticType,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            image_id: image_id.into(),
            types: QuestionTypes { structural, semantic },
        }
    }

    pub fn structural(&self) -> StructuralType {
        self.types.structural
    }

    pub fn semantic(&self) -> SemanticType {
        self.types.semantic
    }

    /// Whether this is a counting question ("how many ...", case-insensitive)
    pub fn is_counting(&self) -> bool {
        self.question.to_lowercase().starts_with(COUNTING_PREFIX)
    }
}

/// Raw entry as found in the dataset file, before validation
#[derive(Debug, Deserialize)]
struct RawRecord {
    question: Option<String>,
    answer: Option<String>,
    #[serde(rename = "imageId")]
    image_id: Option<String>,
    types: Option<RawTypes>,
}

#[derive(Debug, Deserialize)]
struct RawTypes {
    structural: Option<String>,
    semantic: Option<String>,
}

impl RawRecord {
    fn validate(self, id: &str) -> AnalysisResult<QuestionRecord> {
        let malformed = |reason: String| AnalysisError::MalformedRecord {
            id: id.to_string(),
            reason,
        };

        let question = self.question.ok_or_else(|| malformed("missing field 'question'".into()))?;
        let answer = self.answer.ok_or_else(|| malformed("missing field 'answer'".into()))?;
        let image_id = self.image_id.ok_or_else(|| malformed("missing field 'imageId'".into()))?;
        let types = self.types.ok_or_else(|| malformed("missing field 'types'".into()))?;

        let structural_raw = types
            .structural
            .ok_or_else(|| malformed("missing field 'types.structural'".into()))?;
        let structural = StructuralType::from_str(&structural_raw)
            .ok_or_else(|| malformed(format!("unknown structural type '{}'", structural_raw)))?;

        let semantic_raw = types
            .semantic
            .ok_or_else(|| malformed("missing field 'types.semantic'".into()))?;
        let semantic = SemanticType::from_str(&semantic_raw)
            .ok_or_else(|| malformed(format!("unknown semantic type '{}'", semantic_raw)))?;

        Ok(QuestionRecord::new(id, question, answer, image_id, structural, semantic))
    }
}

/// A loaded, validated question dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<QuestionRecord>,
}

impl Dataset {
    pub fn new(records: Vec<QuestionRecord>) -> Self {
        Self { records }
    }

    /// Load and validate a dataset file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;

        let dataset = Self::from_json_str(&content)
            .with_context(|| format!("Failed to load dataset file: {}", path.display()))?;

        tracing::info!("Loaded {} questions from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parse and validate dataset JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(content).context("Dataset must be a JSON object keyed by question id")?;

        let mut records = Vec::with_capacity(entries.len());
        for (id, value) in entries {
            let raw: RawRecord = serde_json::from_value(value).map_err(|e| AnalysisError::MalformedRecord {
                id: id.clone(),
                reason: e.to_string(),
            })?;
            records.push(raw.validate(&id)?);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ground-truth answers in dataset order
    pub fn answers(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.answer.as_str())
    }
}
