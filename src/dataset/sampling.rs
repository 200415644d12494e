//! Seeded sampling
//!
//! Randomness is always injected by the caller so runs are reproducible and
//! tests can pin the exact sampled set.

use rand::seq::index;
use rand::Rng;
use std::collections::HashSet;

use super::QuestionRecord;

/// Sample up to `n` distinct items without replacement, in draw order
///
/// Returns every item (in draw order) when `n >= items.len()`.
pub fn sample<'a, T, R: Rng + ?Sized>(items: &'a [T], n: usize, rng: &mut R) -> Vec<&'a T> {
    let amount = n.min(items.len());
    index::sample(rng, items.len(), amount)
        .into_iter()
        .map(|i| &items[i])
        .collect()
}

/// Pick the questions to benchmark
///
/// Keeps records whose image was sampled. When fewer than `sample_size`
/// match, all of them are used in dataset order; otherwise `sample_size` are
/// drawn with `rng`.
pub fn select_benchmark_questions<'a, R: Rng + ?Sized>(
    records: &'a [QuestionRecord],
    image_ids: &HashSet<String>,
    sample_size: usize,
    rng: &mut R,
) -> Vec<&'a QuestionRecord> {
    let matching: Vec<&QuestionRecord> = records
        .iter()
        .filter(|r| image_ids.contains(&r.image_id))
        .collect();

    tracing::info!("Questions matching sampled images: {}", matching.len());

    if matching.len() < sample_size {
        tracing::warn!(
            "Only {} matching questions, using all of them",
            matching.len()
        );
        return matching;
    }

    sample(&matching, sample_size, rng).into_iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SemanticType, StructuralType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn record(id: &str, image: &str) -> QuestionRecord {
        QuestionRecord::new(id, "What is it?", "cat", image, StructuralType::Query, SemanticType::Obj)
    }

    #[test]
    fn test_sample_is_reproducible() {
        let items: Vec<u32> = (0..100).collect();
        let a = sample(&items, 10, &mut ChaCha8Rng::seed_from_u64(42));
        let b = sample(&items, 10, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);

        let distinct: HashSet<_> = a.iter().collect();
        assert_eq!(distinct.len(), 10);
    }

    #[test]
    fn test_sample_larger_than_pool() {
        let items = vec!["a", "b", "c"];
        let picked = sample(&items, 10, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(picked.len(), 3);
        let distinct: HashSet<_> = picked.into_iter().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_sample_empty_pool() {
        let items: Vec<u8> = vec![];
        assert!(sample(&items, 5, &mut ChaCha8Rng::seed_from_u64(1)).is_empty());
    }

    #[test]
    fn test_select_uses_all_when_too_few() {
        let records = vec![record("q1", "i1"), record("q2", "i2"), record("q3", "i1")];
        let ids: HashSet<String> = ["i1".to_string()].into_iter().collect();
        let selected = select_benchmark_questions(&records, &ids, 50, &mut ChaCha8Rng::seed_from_u64(42));
        let selected_ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(selected_ids, vec!["q1", "q3"]);
    }

    #[test]
    fn test_select_samples_when_enough() {
        let records: Vec<QuestionRecord> = (0..20).map(|i| record(&format!("q{}", i), "img")).collect();
        let ids: HashSet<String> = ["img".to_string()].into_iter().collect();
        let a = select_benchmark_questions(&records, &ids, 5, &mut ChaCha8Rng::seed_from_u64(3));
        let b = select_benchmark_questions(&records, &ids, 5, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }
}
