//! Category balance check
//!
//! Evaluates a fixed, ordered list of named predicates over the dataset.
//! Predicates are not mutually exclusive: a counting question is usually
//! also an object or attribute query, so per-category counts may sum to more
//! than the dataset size.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::aggregate::pct;
use crate::config::BalanceThresholds;
use crate::dataset::{QuestionRecord, SemanticType, StructuralType};
use crate::error::AnalysisResult;

type Predicate = Box<dyn Fn(&QuestionRecord) -> bool>;

/// A named membership test over question records
pub struct CategoryPredicate {
    /// Display number (1-based, stable across reports)
    pub id: u32,
    pub name: String,
    predicate: Predicate,
}

impl CategoryPredicate {
    pub fn new(id: u32, name: impl Into<String>, predicate: impl Fn(&QuestionRecord) -> bool + 'static) -> Self {
        Self {
            id,
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn matches(&self, record: &QuestionRecord) -> bool {
        (self.predicate)(record)
    }

    fn structural(id: u32, name: &str, stype: StructuralType) -> Self {
        Self::new(id, name, move |r| r.structural() == stype)
    }

    fn query(id: u32, name: &str, semantic: SemanticType) -> Self {
        Self::new(id, name, move |r| {
            r.structural() == StructuralType::Query && r.semantic() == semantic
        })
    }
}

impl std::fmt::Debug for CategoryPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryPredicate")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered predicates plus which of them to cross with the counting category
#[derive(Debug)]
pub struct BalancePlan {
    pub categories: Vec<CategoryPredicate>,
    /// Position in `categories` of the counting predicate
    pub counting: usize,
    /// Positions in `categories` whose overlap with counting is reported
    pub overlap_targets: Vec<usize>,
}

impl BalancePlan {
    /// The nine standard categories; counting is crossed with the four query kinds
    pub fn standard() -> Self {
        let categories = vec![
            CategoryPredicate::structural(1, "Verify (yes/no)", StructuralType::Verify),
            CategoryPredicate::structural(2, "Choose", StructuralType::Choose),
            CategoryPredicate::structural(3, "Logical", StructuralType::Logical),
            CategoryPredicate::structural(4, "Compare", StructuralType::Compare),
            CategoryPredicate::query(5, "Object query", SemanticType::Obj),
            CategoryPredicate::query(6, "Attribute query", SemanticType::Attr),
            CategoryPredicate::query(7, "Relation query", SemanticType::Rel),
            CategoryPredicate::query(8, "Category query", SemanticType::Cat),
            CategoryPredicate::new(9, "Counting (how many)", |r| r.is_counting()),
        ];
        Self {
            categories,
            counting: 8,
            overlap_targets: vec![4, 5, 6, 7],
        }
    }
}

/// Size flag of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceFlag {
    TooSmall,
    WellRepresented,
    None,
}

impl BalanceFlag {
    pub fn classify(count: usize, thresholds: &BalanceThresholds) -> Self {
        if count < thresholds.too_small {
            Self::TooSmall
        } else if count > thresholds.well_represented {
            Self::WellRepresented
        } else {
            Self::None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TooSmall => "TOO SMALL",
            Self::WellRepresented => "WELL-REPRESENTED",
            Self::None => "",
        }
    }
}

/// One category of the balance table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRow {
    pub id: u32,
    pub category: String,
    pub count: usize,
    pub pct: f64,
    pub flag: BalanceFlag,
}

/// Overlap between the counting category and another category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapRow {
    pub id: u32,
    pub category: String,
    pub overlap: usize,
}

/// Result of a balance check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub total: usize,
    pub rows: Vec<BalanceRow>,
    pub counting_total: usize,
    pub overlaps: Vec<OverlapRow>,
}

impl BalanceReport {
    /// Run `plan` over `records`
    ///
    /// Overlaps are intersections of record positions, so two entries with
    /// identical text are still two records.
    pub fn compute(
        records: &[QuestionRecord],
        plan: &BalancePlan,
        thresholds: &BalanceThresholds,
    ) -> AnalysisResult<Self> {
        let total = records.len();

        let members: Vec<HashSet<usize>> = plan
            .categories
            .iter()
            .map(|category| {
                records
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| category.matches(r))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();

        let rows = plan
            .categories
            .iter()
            .zip(&members)
            .map(|(category, matched)| {
                let count = matched.len();
                Ok(BalanceRow {
                    id: category.id,
                    category: category.name.clone(),
                    count,
                    pct: pct(count, total)?,
                    flag: BalanceFlag::classify(count, thresholds),
                })
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        let counting = &members[plan.counting];
        let overlaps = plan
            .overlap_targets
            .iter()
            .map(|&target| OverlapRow {
                id: plan.categories[target].id,
                category: plan.categories[target].name.clone(),
                overlap: counting.intersection(&members[target]).count(),
            })
            .collect();

        Ok(Self {
            total,
            rows,
            counting_total: counting.len(),
            overlaps,
        })
    }

    pub fn row(&self, id: u32) -> Option<&BalanceRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}
