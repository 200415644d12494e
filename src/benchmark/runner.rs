//! Benchmarking loop
//!
//! Runs every model on every selected question. Failures are isolated: a
//! missing image skips its question, a failing model call records the
//! `ERROR` sentinel for that model only, and both are appended to the issue
//! log while the loop carries on.

use serde::Serialize;

use super::matching::{exact_match, normalized_match, FormatObservations};
use super::timing::{AccuracySummary, TimingSummary};
use crate::dataset::QuestionRecord;
use crate::error::AnalysisError;
use crate::images::ImageSource;
use crate::models::{measure_sync, VqaModel};

/// Answer recorded when a prediction fails
pub const ERROR_ANSWER: &str = "ERROR";

/// One model's answer to one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    pub model: String,
    pub predicted_answer: String,
    /// Wall-clock seconds, absent when the call failed
    pub elapsed_seconds: Option<f64>,
    pub exact_match: bool,
    pub normalized_match: bool,
}

impl InferenceResult {
    pub fn success(model: &str, predicted: String, elapsed_seconds: f64, ground_truth: &str) -> Self {
        Self {
            model: model.to_string(),
            exact_match: exact_match(&predicted, ground_truth),
            normalized_match: normalized_match(&predicted, ground_truth),
            predicted_answer: predicted,
            elapsed_seconds: Some(elapsed_seconds),
        }
    }

    /// Failed calls never count as matches, whatever the ground truth
    pub fn failure(model: &str) -> Self {
        Self {
            model: model.to_string(),
            predicted_answer: ERROR_ANSWER.to_string(),
            elapsed_seconds: None,
            exact_match: false,
            normalized_match: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.elapsed_seconds.is_none()
    }
}

/// All model answers for one benchmarked question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRow {
    pub question_id: String,
    pub image_id: String,
    pub question: String,
    pub ground_truth: String,
    pub structural: String,
    pub semantic: String,
    /// One result per model, in model order
    pub results: Vec<InferenceResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingResource,
    PredictionFailure,
}

/// A non-fatal problem met during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

/// Issues in the order they occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a domain error as an issue
    pub fn push(&mut self, error: &AnalysisError) {
        let kind = match error {
            AnalysisError::MissingResource { .. } => IssueKind::MissingResource,
            _ => IssueKind::PredictionFailure,
        };
        tracing::warn!("{}", error);
        self.issues.push(Issue {
            kind,
            message: error.to_string(),
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

/// Output of one benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRun {
    pub models: Vec<String>,
    pub rows: Vec<InferenceRow>,
    pub issues: IssueLog,
}

impl BenchmarkRun {
    fn results_for(&self, model_index: usize) -> impl Iterator<Item = (&InferenceRow, &InferenceResult)> {
        self.rows
            .iter()
            .filter_map(move |row| row.results.get(model_index).map(|result| (row, result)))
    }

    /// Latency statistics per model; `None` for a model with no success
    pub fn timing(&self, full_dataset_size: usize) -> Vec<Option<TimingSummary>> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let elapsed: Vec<Option<f64>> = self.results_for(i).map(|(_, r)| r.elapsed_seconds).collect();
                TimingSummary::compute(name, &elapsed, full_dataset_size)
            })
            .collect()
    }

    pub fn accuracy(&self) -> Vec<AccuracySummary> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut summary = AccuracySummary {
                    model: name.clone(),
                    total: 0,
                    exact_matches: 0,
                    normalized_matches: 0,
                };
                for (_, result) in self.results_for(i) {
                    summary.total += 1;
                    summary.exact_matches += usize::from(result.exact_match);
                    summary.normalized_matches += usize::from(result.normalized_match);
                }
                summary
            })
            .collect()
    }

    /// Answer format observations, with vocabulary misses for models that have one
    pub fn observations(&self, models: &[Box<dyn VqaModel>]) -> Vec<FormatObservations> {
        models
            .iter()
            .enumerate()
            .map(|(i, model)| {
                let pairs = self
                    .results_for(i)
                    .map(|(row, result)| (result.predicted_answer.as_str(), row.ground_truth.as_str()));
                FormatObservations::compute(model.name(), pairs, model.vocabulary())
            })
            .collect()
    }
}

/// Run every model on every record, in input order
pub fn run_benchmark(
    records: &[&QuestionRecord],
    models: &[Box<dyn VqaModel>],
    images: &dyn ImageSource,
) -> BenchmarkRun {
    let mut rows = Vec::with_capacity(records.len());
    let mut issues = IssueLog::new();

    for (i, record) in records.iter().enumerate() {
        let image = match images.locate(&record.image_id) {
            Ok(path) => path,
            Err(e) => {
                issues.push(&e);
                continue;
            }
        };

        let mut results = Vec::with_capacity(models.len());
        for model in models {
            let (prediction, duration) = measure_sync(|| model.predict(&image, &record.question));
            let result = match prediction {
                Ok(answer) => InferenceResult::success(model.name(), answer, duration.as_secs_f64(), &record.answer),
                Err(e) => {
                    issues.push(&AnalysisError::PredictionFailure {
                        model: model.name().to_string(),
                        id: record.id.clone(),
                        reason: format!("{:#}", e),
                    });
                    InferenceResult::failure(model.name())
                }
            };
            tracing::debug!(
                "{} on {}: {:?} ({:?})",
                result.model,
                record.id,
                result.predicted_answer,
                result.elapsed_seconds
            );
            results.push(result);
        }

        rows.push(InferenceRow {
            question_id: record.id.clone(),
            image_id: record.image_id.clone(),
            question: record.question.clone(),
            ground_truth: record.answer.clone(),
            structural: record.structural().name().to_string(),
            semantic: record.semantic().name().to_string(),
            results,
        });

        if (i + 1) % 10 == 0 {
            tracing::info!("{}/{} questions done", i + 1, records.len());
        }
    }

    BenchmarkRun {
        models: models.iter().map(|m| m.name().to_string()).collect(),
        rows,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SemanticType, StructuralType};
    use crate::error::AnalysisResult;
    use crate::models::{ModelConfig, Vocabulary};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    struct FakeImages {
        present: HashSet<String>,
    }

    impl ImageSource for FakeImages {
        fn locate(&self, image_id: &str) -> AnalysisResult<PathBuf> {
            if self.present.contains(image_id) {
                Ok(PathBuf::from(format!("/images/{}.jpg", image_id)))
            } else {
                Err(AnalysisError::MissingResource {
                    resource: format!("/images/{}.jpg", image_id),
                })
            }
        }
    }

    /// Answers with a fixed string, failing on listed questions
    struct ScriptedModel {
        config: ModelConfig,
        answer: String,
        fail_on: Vec<String>,
        vocabulary: Option<Vocabulary>,
    }

    impl ScriptedModel {
        fn boxed(name: &str, answer: &str, fail_on: &[&str]) -> Box<dyn VqaModel> {
            Box::new(Self {
                config: ModelConfig::new(name, "scripted"),
                answer: answer.to_string(),
                fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
                vocabulary: None,
            })
        }
    }

    impl VqaModel for ScriptedModel {
        fn config(&self) -> &ModelConfig {
            &self.config
        }

        fn predict(&self, _image: &Path, question: &str) -> anyhow::Result<String> {
            if self.fail_on.iter().any(|q| q == question) {
                anyhow::bail!("out of memory");
            }
            Ok(self.answer.clone())
        }

        fn vocabulary(&self) -> Option<&Vocabulary> {
            self.vocabulary.as_ref()
        }
    }

    fn records() -> Vec<QuestionRecord> {
        vec![
            QuestionRecord::new("q1", "Is it red?", "Yes", "img1", StructuralType::Verify, SemanticType::Attr),
            QuestionRecord::new("q2", "What is it?", "cat", "img2", StructuralType::Query, SemanticType::Cat),
            QuestionRecord::new("q3", "How many dogs?", "two", "img3", StructuralType::Query, SemanticType::Obj),
        ]
    }

    fn all_images() -> FakeImages {
        FakeImages {
            present: ["img1", "img2", "img3"].iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_failure_is_isolated() {
        let records = records();
        let selected: Vec<&QuestionRecord> = records.iter().collect();
        let models = vec![
            ScriptedModel::boxed("a", "yes", &[]),
            ScriptedModel::boxed("b", "yes", &["What is it?"]),
        ];

        let run = run_benchmark(&selected, &models, &all_images());

        assert_eq!(run.rows.len(), 3);
        assert_eq!(run.models, vec!["a".to_string(), "b".to_string()]);
        let failed = &run.rows[1].results[1];
        assert_eq!(failed.predicted_answer, ERROR_ANSWER);
        assert!(failed.elapsed_seconds.is_none());
        assert!(!failed.exact_match);
        assert!(run.rows[1].results[0].elapsed_seconds.is_some());
        assert!(run.rows[2].results[1].elapsed_seconds.is_some());

        assert_eq!(run.issues.len(), 1);
        let issue = &run.issues.issues()[0];
        assert_eq!(issue.kind, IssueKind::PredictionFailure);
        assert_eq!(issue.message, "b error on q2: out of memory");
    }

    #[test]
    fn test_missing_image_skips_record() {
        let records = records();
        let selected: Vec<&QuestionRecord> = records.iter().collect();
        let images = FakeImages {
            present: ["img1", "img3"].iter().map(|s| s.to_string()).collect(),
        };
        let models = vec![ScriptedModel::boxed("a", "yes", &[])];

        let run = run_benchmark(&selected, &models, &images);

        let ids: Vec<&str> = run.rows.iter().map(|r| r.question_id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
        assert_eq!(run.issues.count(IssueKind::MissingResource), 1);
        assert_eq!(run.issues.issues()[0].message, "Missing resource: /images/img2.jpg");
    }

    #[test]
    fn test_accuracy_and_timing() {
        let records = records();
        let selected: Vec<&QuestionRecord> = records.iter().collect();
        let models = vec![
            ScriptedModel::boxed("a", "yes", &["How many dogs?"]),
            ScriptedModel::boxed("b", "2", &[]),
        ];

        let run = run_benchmark(&selected, &models, &all_images());

        let accuracy = run.accuracy();
        assert_eq!(accuracy[0].total, 3);
        assert_eq!(accuracy[0].exact_matches, 1);
        assert_eq!(accuracy[1].exact_matches, 0);
        // "2" matches "two" once normalized
        assert_eq!(accuracy[1].normalized_matches, 1);

        let timing = run.timing(1000);
        let a = timing[0].as_ref().unwrap();
        assert_eq!(a.successes, 2);
        assert_eq!(a.attempted, 3);
        assert_eq!(timing[1].as_ref().unwrap().successes, 3);
    }

    #[test]
    fn test_observations_with_vocabulary() {
        let records = records();
        let selected: Vec<&QuestionRecord> = records.iter().collect();
        let models: Vec<Box<dyn VqaModel>> = vec![Box::new(ScriptedModel {
            config: ModelConfig::new("vilt", "scripted"),
            answer: "yes".to_string(),
            fail_on: vec![],
            vocabulary: Some(Vocabulary::new(["yes", "no", "cat"]).unwrap()),
        })];

        let run = run_benchmark(&selected, &models, &all_images());
        let observations = run.observations(&models);

        assert_eq!(observations[0].case_only_mismatches, 1);
        let misses = observations[0].vocabulary_misses.unwrap();
        assert_eq!(misses.wrong, 2);
        assert_eq!(misses.in_vocabulary, 1);
        assert_eq!(misses.not_in_vocabulary, 1);
    }

    #[test]
    fn test_failure_never_matches() {
        let result = InferenceResult::failure("blip");
        assert!(result.is_error());
        assert!(!result.exact_match);
        assert!(!result.normalized_match);
    }
}
