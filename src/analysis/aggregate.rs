//! Grouping, counting and distribution summaries

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use crate::dataset::{sample, QuestionRecord, SemanticType, StructuralType};
use crate::error::{AnalysisError, AnalysisResult};

/// Percentage of `count` over `total`
///
/// Precondition: `total > 0`. An empty pool has no meaningful percentage, so
/// this returns [`AnalysisError::EmptyPool`] instead of dividing by zero.
pub fn pct(count: usize, total: usize) -> AnalysisResult<f64> {
    if total == 0 {
        return Err(AnalysisError::EmptyPool);
    }
    Ok(100.0 * count as f64 / total as f64)
}

/// Counts per category, in first-seen order
#[derive(Debug, Clone)]
pub struct CategoryCounts<K> {
    entries: Vec<(K, usize)>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> CategoryCounts<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Increment the count for `key`
    pub fn add(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    pub fn get(&self, key: &K) -> usize {
        self.index.get(key).map(|&pos| self.entries[pos].1).unwrap_or(0)
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Number of distinct categories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order
    pub fn entries(&self) -> &[(K, usize)] {
        &self.entries
    }

    /// Entries by descending count; ties keep first-seen order
    pub fn sorted_desc(&self) -> Vec<(K, usize)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

impl<K: Eq + Hash + Clone> Default for CategoryCounts<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> FromIterator<K> for CategoryCounts<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut counts = Self::new();
        for key in iter {
            counts.add(key);
        }
        counts
    }
}

/// Group records by `key_fn` and count each group
pub fn aggregate<'a, I, K, F>(records: I, key_fn: F) -> CategoryCounts<K>
where
    I: IntoIterator<Item = &'a QuestionRecord>,
    K: Eq + Hash + Clone,
    F: Fn(&QuestionRecord) -> K,
{
    records.into_iter().map(|r| key_fn(r)).collect()
}

/// One line of a distribution table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRow {
    /// Which distribution this row belongs to ("structural", "semantic", ...)
    pub kind: String,
    pub category: String,
    pub count: usize,
    /// Percentage of the distribution's pool
    pub pct: f64,
}

/// A question picked as an illustration of its structural type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleQuestion {
    pub structural: StructuralType,
    pub question: String,
    pub answer: String,
}

/// Label distributions of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub total: usize,
    /// Structural types, by descending count
    pub structural: Vec<DistributionRow>,
    /// Semantic types, by descending count
    pub semantic: Vec<DistributionRow>,
    /// Query questions broken down by semantic type (pct of queries)
    pub query_semantic: Vec<DistributionRow>,
    pub query_count: usize,
    /// Number of "how many" questions
    pub counting_count: usize,
    /// Counting questions by structural type (pct of counting questions)
    pub counting_structural: Vec<DistributionRow>,
    /// Counting questions by semantic type (pct of counting questions)
    pub counting_semantic: Vec<DistributionRow>,
    pub examples: Vec<ExampleQuestion>,
}

fn distribution_rows<K: Eq + Hash + Clone + ToString>(
    kind: &str,
    counts: &CategoryCounts<K>,
    pool: usize,
) -> AnalysisResult<Vec<DistributionRow>> {
    counts
        .sorted_desc()
        .into_iter()
        .map(|(category, count)| {
            Ok(DistributionRow {
                kind: kind.to_string(),
                category: category.to_string(),
                count,
                pct: pct(count, pool)?,
            })
        })
        .collect()
}

impl DistributionReport {
    /// Compute all distributions
    ///
    /// `examples_per_type` questions are drawn per structural type with `rng`.
    /// Fails with [`AnalysisError::EmptyPool`] on an empty dataset.
    pub fn compute<R: Rng + ?Sized>(
        records: &[QuestionRecord],
        examples_per_type: usize,
        rng: &mut R,
    ) -> AnalysisResult<Self> {
        let total = records.len();
        if total == 0 {
            return Err(AnalysisError::EmptyPool);
        }

        let structural = aggregate(records, |r| r.structural());
        let semantic = aggregate(records, |r| r.semantic());

        let queries: Vec<&QuestionRecord> = records
            .iter()
            .filter(|r| r.structural() == StructuralType::Query)
            .collect();
        let query_semantic = aggregate(queries.iter().copied(), |r| r.semantic());

        let counting: Vec<&QuestionRecord> = records.iter().filter(|r| r.is_counting()).collect();
        let counting_structural = aggregate(counting.iter().copied(), |r| r.structural());
        let counting_semantic = aggregate(counting.iter().copied(), |r| r.semantic());

        // Empty sub-pools simply yield no rows
        let query_rows = if queries.is_empty() {
            Vec::new()
        } else {
            distribution_rows("query_semantic", &query_semantic, queries.len())?
        };
        let (counting_structural_rows, counting_semantic_rows) = if counting.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            (
                distribution_rows("counting_structural", &counting_structural, counting.len())?,
                distribution_rows("counting_semantic", &counting_semantic, counting.len())?,
            )
        };

        let mut examples = Vec::new();
        for stype in StructuralType::ALL {
            let pool: Vec<&QuestionRecord> = records.iter().filter(|r| r.structural() == stype).collect();
            for q in sample(&pool, examples_per_type, rng) {
                examples.push(ExampleQuestion {
                    structural: stype,
                    question: q.question.clone(),
                    answer: q.answer.clone(),
                });
            }
        }

        Ok(Self {
            total,
            structural: distribution_rows("structural", &structural, total)?,
            semantic: distribution_rows("semantic", &semantic, total)?,
            query_semantic: query_rows,
            query_count: queries.len(),
            counting_count: counting.len(),
            counting_structural: counting_structural_rows,
            counting_semantic: counting_semantic_rows,
            examples,
        })
    }

    /// Every row of every table, for tabular output
    pub fn all_rows(&self) -> impl Iterator<Item = &DistributionRow> {
        self.structural
            .iter()
            .chain(self.semantic.iter())
            .chain(self.query_semantic.iter())
            .chain(self.counting_structural.iter())
            .chain(self.counting_semantic.iter())
    }

    /// Share of counting questions in the whole dataset
    pub fn counting_pct(&self) -> AnalysisResult<f64> {
        pct(self.counting_count, self.total)
    }
}

/// Count records per semantic type within one structural type
pub fn semantic_within(records: &[QuestionRecord], structural: StructuralType) -> CategoryCounts<SemanticType> {
    aggregate(
        records.iter().filter(|r| r.structural() == structural),
        |r| r.semantic(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn record(id: &str, q: &str, s: StructuralType, se: SemanticType) -> QuestionRecord {
        QuestionRecord::new(id, q, "x", "img", s, se)
    }

    fn fixture() -> Vec<QuestionRecord> {
        vec![
            record("1", "Is it red?", StructuralType::Verify, SemanticType::Attr),
            record("2", "What is on the table?", StructuralType::Query, SemanticType::Rel),
            record("3", "How many cups are there?", StructuralType::Query, SemanticType::Obj),
            record("4", "Is it big or small?", StructuralType::Choose, SemanticType::Attr),
            record("5", "What color is it?", StructuralType::Query, SemanticType::Attr),
            record("6", "Are both red?", StructuralType::Compare, SemanticType::Attr),
        ]
    }

    #[test]
    fn test_pct() {
        assert!((pct(1, 4).unwrap() - 25.0).abs() < 1e-9);
        assert!((pct(0, 4).unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_pct_empty_pool_fails() {
        assert_eq!(pct(0, 0), Err(AnalysisError::EmptyPool));
    }

    #[test]
    fn test_aggregate_by_structural() {
        let records = fixture();
        let counts = aggregate(&records, |r| r.structural());
        assert_eq!(counts.get(&StructuralType::Query), 3);
        assert_eq!(counts.get(&StructuralType::Verify), 1);
        assert_eq!(counts.get(&StructuralType::Logical), 0);
        assert_eq!(counts.total(), records.len());
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn test_aggregate_does_not_mutate() {
        let records = fixture();
        let before = records.clone();
        let _ = aggregate(&records, |r| r.is_counting());
        assert_eq!(records, before);
    }

    #[test]
    fn test_sorted_desc_ties_first_seen() {
        let counts: CategoryCounts<&str> = ["b", "a", "c", "a", "c"].into_iter().collect();
        assert_eq!(counts.sorted_desc(), vec![("a", 2), ("c", 2), ("b", 1)]);
        assert_eq!(counts.entries()[0], ("b", 1));
    }

    #[test]
    fn test_semantic_within_query() {
        let records = fixture();
        let counts = semantic_within(&records, StructuralType::Query);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get(&SemanticType::Rel), 1);
        assert_eq!(counts.get(&SemanticType::Obj), 1);
        assert_eq!(counts.get(&SemanticType::Attr), 1);
    }

    #[test]
    fn test_distribution_report() {
        let records = fixture();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let report = DistributionReport::compute(&records, 3, &mut rng).unwrap();

        assert_eq!(report.total, 6);
        assert_eq!(report.structural[0].category, "query");
        assert_eq!(report.structural[0].count, 3);
        assert!((report.structural[0].pct - 50.0).abs() < 1e-9);
        assert_eq!(report.query_count, 3);
        assert_eq!(report.counting_count, 1);
        assert_eq!(report.counting_structural.len(), 1);
        assert!((report.counting_structural[0].pct - 100.0).abs() < 1e-9);
        assert!((report.counting_pct().unwrap() - 100.0 / 6.0).abs() < 1e-9);

        // 3 examples max per type, capped by pool size: query 3 + verify, choose, compare 1 each
        assert_eq!(report.examples.len(), 6);
        let pct_sum: f64 = report.structural.iter().map(|r| r.pct).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_report_no_counting_questions() {
        let records = vec![record("1", "Is it red?", StructuralType::Verify, SemanticType::Attr)];
        let report = DistributionReport::compute(&records, 3, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(report.counting_count, 0);
        assert!(report.counting_structural.is_empty());
        assert!(report.query_semantic.is_empty());
    }

    #[test]
    fn test_distribution_report_empty_dataset() {
        let err = DistributionReport::compute(&[], 3, &mut ChaCha8Rng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err, AnalysisError::EmptyPool);
    }
}
