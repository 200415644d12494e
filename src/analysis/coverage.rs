//! Vocabulary coverage of ground-truth answers
//!
//! Membership is exact string equality against the model vocabulary; no
//! normalization is applied, so coverage reflects what a classifier-style
//! model can literally output.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::aggregate::{aggregate, pct};
use crate::dataset::{QuestionRecord, SemanticType, StructuralType};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::Vocabulary;

/// Default size of the top-uncovered report
pub const DEFAULT_TOP_UNCOVERED: usize = 30;

/// Slice of the dataset a coverage figure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "category")]
pub enum Category {
    /// Every record (question-level coverage)
    Overall,
    /// Distinct answers (unique coverage)
    Unique,
    /// "How many" questions
    Counting,
    Structural(StructuralType),
    Semantic(SemanticType),
}

impl Category {
    /// Table grouping of this category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Unique => "unique",
            Self::Counting => "counting",
            Self::Structural(_) => "structural",
            Self::Semantic(_) => "semantic",
        }
    }

    /// Label within its grouping
    pub fn label(&self) -> &'static str {
        match self {
            Self::Overall | Self::Unique | Self::Counting => "all",
            Self::Structural(s) => s.name(),
            Self::Semantic(s) => s.name(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural(s) => write!(f, "{}", s),
            Self::Semantic(s) => write!(f, "{}", s),
            other => f.write_str(other.kind()),
        }
    }
}

/// Covered/total counts for one category
///
/// The percentage is always derived from the counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageResult {
    category: Category,
    total: usize,
    covered: usize,
}

impl CoverageResult {
    /// Fails with [`AnalysisError::InvalidCoverage`] if `covered > total`
    pub fn new(category: Category, total: usize, covered: usize) -> AnalysisResult<Self> {
        if covered > total {
            return Err(AnalysisError::InvalidCoverage {
                category: category.to_string(),
                covered,
                total,
            });
        }
        Ok(Self {
            category,
            total,
            covered,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn covered(&self) -> usize {
        self.covered
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// `100 * covered / total`, or [`AnalysisError::EmptyCategory`] when the
    /// category has no records
    pub fn pct(&self) -> AnalysisResult<f64> {
        pct(self.covered, self.total).map_err(|_| AnalysisError::EmptyCategory {
            category: self.category.to_string(),
        })
    }
}

/// An answer the vocabulary cannot express
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncoveredAnswer {
    pub answer: String,
    pub count: usize,
}

/// Coverage of a dataset against one vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Distinct answers found in the vocabulary
    pub unique: CoverageResult,
    /// Records whose answer is in the vocabulary
    pub question_level: CoverageResult,
    /// Every structural type, then every semantic type, in canonical order.
    /// Empty slices are kept with `total == 0`.
    pub per_category: Vec<CoverageResult>,
    /// Counting questions, if there are any
    pub counting: Option<CoverageResult>,
}

fn slice_coverage<'a>(
    category: Category,
    records: impl Iterator<Item = &'a QuestionRecord>,
    vocabulary: &Vocabulary,
) -> AnalysisResult<CoverageResult> {
    let (total, covered) = records.fold((0, 0), |(total, covered), r| {
        (total + 1, covered + usize::from(vocabulary.contains(&r.answer)))
    });
    CoverageResult::new(category, total, covered)
}

impl CoverageReport {
    /// Compute coverage of `records` against `vocabulary`
    ///
    /// Fails with [`AnalysisError::EmptyPool`] when there are no records.
    pub fn compute(records: &[QuestionRecord], vocabulary: &Vocabulary) -> AnalysisResult<Self> {
        if records.is_empty() {
            return Err(AnalysisError::EmptyPool);
        }

        let distinct: HashSet<&str> = records.iter().map(|r| r.answer.as_str()).collect();
        let unique_covered = distinct.iter().filter(|a| vocabulary.contains(a)).count();
        let unique = CoverageResult::new(Category::Unique, distinct.len(), unique_covered)?;

        let question_level = slice_coverage(Category::Overall, records.iter(), vocabulary)?;

        let mut per_category = Vec::with_capacity(StructuralType::ALL.len() + SemanticType::ALL.len());
        for stype in StructuralType::ALL {
            per_category.push(slice_coverage(
                Category::Structural(stype),
                records.iter().filter(|r| r.structural() == stype),
                vocabulary,
            )?);
        }
        for stype in SemanticType::ALL {
            per_category.push(slice_coverage(
                Category::Semantic(stype),
                records.iter().filter(|r| r.semantic() == stype),
                vocabulary,
            )?);
        }

        let counting = slice_coverage(
            Category::Counting,
            records.iter().filter(|r| r.is_counting()),
            vocabulary,
        )?;
        let counting = if counting.is_empty() { None } else { Some(counting) };

        tracing::debug!(
            "Coverage: unique {}/{}, question-level {}/{}",
            unique.covered(),
            unique.total(),
            question_level.covered(),
            question_level.total()
        );

        Ok(Self {
            unique,
            question_level,
            per_category,
            counting,
        })
    }

    /// Share of distinct answers the vocabulary covers
    pub fn unique_coverage_pct(&self) -> AnalysisResult<f64> {
        self.unique.pct()
    }

    /// Share of records whose answer the vocabulary covers (frequency-weighted)
    pub fn question_level_coverage_pct(&self) -> AnalysisResult<f64> {
        self.question_level.pct()
    }

    pub fn get(&self, category: Category) -> Option<&CoverageResult> {
        match category {
            Category::Unique => Some(&self.unique),
            Category::Overall => Some(&self.question_level),
            Category::Counting => self.counting.as_ref(),
            other => self.per_category.iter().find(|c| c.category() == other),
        }
    }

    /// Non-empty categories whose coverage falls below `threshold` percent
    pub fn below_threshold(&self, threshold: f64) -> Vec<&CoverageResult> {
        self.per_category
            .iter()
            .filter(|c| matches!(c.pct(), Ok(p) if p < threshold))
            .collect()
    }
}

/// Most frequent answers missing from the vocabulary
///
/// Ranked by descending frequency; ties keep the order in which answers first
/// appear in `records`.
pub fn top_uncovered(records: &[QuestionRecord], vocabulary: &Vocabulary, k: usize) -> Vec<UncoveredAnswer> {
    aggregate(records, |r| r.answer.clone())
        .sorted_desc()
        .into_iter()
        .filter(|(answer, _)| !vocabulary.contains(answer))
        .take(k)
        .map(|(answer, count)| UncoveredAnswer { answer, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, q: &str, answer: &str, s: StructuralType, se: SemanticType) -> QuestionRecord {
        QuestionRecord::new(id, q, answer, "img", s, se)
    }

    fn vocab(labels: &[&str]) -> Vocabulary {
        Vocabulary::new(labels.iter().copied()).unwrap()
    }

    fn answers(answers: &[&str]) -> Vec<QuestionRecord> {
        answers
            .iter()
            .enumerate()
            .map(|(i, a)| record(&i.to_string(), "What is it?", a, StructuralType::Query, SemanticType::Obj))
            .collect()
    }

    #[test]
    fn test_unique_and_question_level_coverage() {
        let records = answers(&["yes", "yes", "no", "3"]);
        let report = CoverageReport::compute(&records, &vocab(&["yes", "no", "2"])).unwrap();

        assert_eq!(report.unique.covered(), 2);
        assert_eq!(report.unique.total(), 3);
        assert!((report.unique_coverage_pct().unwrap() - 200.0 / 3.0).abs() < 1e-9);

        assert_eq!(report.question_level.covered(), 3);
        assert_eq!(report.question_level.total(), 4);
        assert!((report.question_level_coverage_pct().unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_unique_coverage_can_exceed_question_level() {
        // Frequent answer uncovered, rare answers covered
        let records = answers(&["x", "x", "x", "yes", "no"]);
        let report = CoverageReport::compute(&records, &vocab(&["yes", "no"])).unwrap();
        assert!(report.unique_coverage_pct().unwrap() > report.question_level_coverage_pct().unwrap());
    }

    #[test]
    fn test_per_category_coverage() {
        let records = vec![
            record("1", "Is it red?", "yes", StructuralType::Verify, SemanticType::Attr),
            record("2", "Is it blue?", "no", StructuralType::Verify, SemanticType::Attr),
            record("3", "What is it?", "teapot", StructuralType::Query, SemanticType::Obj),
            record("4", "How many cups?", "2", StructuralType::Query, SemanticType::Obj),
        ];
        let report = CoverageReport::compute(&records, &vocab(&["yes", "no", "2"])).unwrap();

        assert_eq!(report.per_category.len(), 10);

        let verify = report.get(Category::Structural(StructuralType::Verify)).unwrap();
        assert_eq!((verify.covered(), verify.total()), (2, 2));
        assert!((verify.pct().unwrap() - 100.0).abs() < 1e-9);

        let obj = report.get(Category::Semantic(SemanticType::Obj)).unwrap();
        assert_eq!((obj.covered(), obj.total()), (1, 2));

        let counting = report.get(Category::Counting).unwrap();
        assert_eq!((counting.covered(), counting.total()), (1, 1));
    }

    #[test]
    fn test_empty_category_signals_explicitly() {
        let records = answers(&["yes"]);
        let report = CoverageReport::compute(&records, &vocab(&["yes"])).unwrap();

        let logical = report.get(Category::Structural(StructuralType::Logical)).unwrap();
        assert!(logical.is_empty());
        assert_eq!(
            logical.pct(),
            Err(AnalysisError::EmptyCategory {
                category: "logical".to_string()
            })
        );
        assert!(report.counting.is_none());
    }

    #[test]
    fn test_below_threshold_skips_empty() {
        let records = vec![
            record("1", "Is it red?", "yes", StructuralType::Verify, SemanticType::Attr),
            record("2", "What is it?", "teapot", StructuralType::Query, SemanticType::Obj),
        ];
        let report = CoverageReport::compute(&records, &vocab(&["yes"])).unwrap();
        let low: Vec<Category> = report.below_threshold(70.0).iter().map(|c| c.category()).collect();
        assert_eq!(
            low,
            vec![
                Category::Structural(StructuralType::Query),
                Category::Semantic(SemanticType::Obj)
            ]
        );
    }

    #[test]
    fn test_empty_records_fail() {
        let err = CoverageReport::compute(&[], &vocab(&["yes"])).unwrap_err();
        assert_eq!(err, AnalysisError::EmptyPool);
    }

    #[test]
    fn test_coverage_result_invariant() {
        assert!(CoverageResult::new(Category::Overall, 3, 3).is_ok());
        assert!(matches!(
            CoverageResult::new(Category::Overall, 3, 4),
            Err(AnalysisError::InvalidCoverage { .. })
        ));
    }

    #[test]
    fn test_top_uncovered_ties_first_seen() {
        let mut list = Vec::new();
        // first-seen order: red, blue, green
        list.extend(["red", "blue", "green"]);
        list.extend(["red"; 4]);
        list.extend(["blue"; 2]);
        list.extend(["green"; 2]);
        let records = answers(&list);

        let top = top_uncovered(&records, &vocab(&["red"]), 2);
        assert_eq!(
            top,
            vec![
                UncoveredAnswer { answer: "blue".to_string(), count: 3 },
                UncoveredAnswer { answer: "green".to_string(), count: 3 },
            ]
        );
    }

    #[test]
    fn test_top_uncovered_tie_order_follows_input() {
        let records = answers(&["green", "blue", "blue", "green"]);
        let top = top_uncovered(&records, &vocab(&["red"]), 30);
        let names: Vec<&str> = top.iter().map(|u| u.answer.as_str()).collect();
        assert_eq!(names, vec!["green", "blue"]);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::Overall.kind(), "overall");
        assert_eq!(Category::Overall.label(), "all");
        assert_eq!(Category::Semantic(SemanticType::Rel).kind(), "semantic");
        assert_eq!(Category::Semantic(SemanticType::Rel).label(), "rel");
    }
}
