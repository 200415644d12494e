//! Latency and accuracy aggregates
//!
//! Timing statistics cover successful predictions only; accuracy covers every
//! attempted row, so failed predictions count as wrong.

use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};

/// Latency statistics for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub model: String,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Predictions that returned an answer
    pub successes: usize,
    /// Predictions attempted
    pub attempted: usize,
    /// Projected hours for the full question set at the mean latency
    pub est_full_hours: f64,
}

impl TimingSummary {
    /// Summarize elapsed times (`None` marks a failed call)
    ///
    /// Returns `None` when no call succeeded.
    pub fn compute(model: &str, elapsed: &[Option<f64>], full_dataset_size: usize) -> Option<Self> {
        let mut times: Vec<f64> = elapsed.iter().flatten().copied().collect();
        if times.is_empty() {
            return None;
        }
        times.sort_by(|a, b| a.total_cmp(b));

        let mean = mean(&times);
        Some(Self {
            model: model.to_string(),
            mean,
            median: median(&times),
            std: std_dev(&times),
            min: times[0],
            max: times[times.len() - 1],
            successes: times.len(),
            attempted: elapsed.len(),
            est_full_hours: mean * full_dataset_size as f64 / 3600.0,
        })
    }

    /// Format as a summary string
    pub fn format_summary(&self) -> String {
        format!(
            "mean: {:.3}s | median: {:.3}s | std: {:.3}s | min: {:.3}s | max: {:.3}s | ok: {}/{} | full run: {:.1}h",
            self.mean,
            self.median,
            self.std,
            self.min,
            self.max,
            self.successes,
            self.attempted,
            self.est_full_hours
        )
    }
}

/// Exact-match accuracy for one model over all rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub model: String,
    pub total: usize,
    pub exact_matches: usize,
    pub normalized_matches: usize,
}

impl AccuracySummary {
    /// Fraction of exact matches; [`AnalysisError::EmptyPool`] when there are no rows
    pub fn raw_accuracy(&self) -> AnalysisResult<f64> {
        ratio(self.exact_matches, self.total)
    }

    /// Fraction of normalized matches; [`AnalysisError::EmptyPool`] when there are no rows
    pub fn normalized_accuracy(&self) -> AnalysisResult<f64> {
        ratio(self.normalized_matches, self.total)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "raw: {} | normalized: {} | rows: {}",
            format_fraction(self.raw_accuracy()),
            format_fraction(self.normalized_accuracy()),
            self.total
        )
    }
}

fn ratio(part: usize, total: usize) -> AnalysisResult<f64> {
    if total == 0 {
        return Err(AnalysisError::EmptyPool);
    }
    Ok(part as f64 / total as f64)
}

fn format_fraction(value: AnalysisResult<f64>) -> String {
    match value {
        Ok(v) => format!("{:.1}%", v * 100.0),
        Err(_) => "N/A".to_string(),
    }
}

// The helpers below expect a non-empty slice; `TimingSummary::compute`
// returns `None` before calling them on an empty one.

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of sorted values
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Calculate population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_ignores_failures() {
        let elapsed = [Some(0.5), None, Some(1.5), Some(1.0)];
        let summary = TimingSummary::compute("blip", &elapsed, 3600).unwrap();
        assert_eq!(summary.successes, 3);
        assert_eq!(summary.attempted, 4);
        assert!((summary.mean - 1.0).abs() < 0.001);
        assert!((summary.median - 1.0).abs() < 0.001);
        assert!((summary.min - 0.5).abs() < 0.001);
        assert!((summary.max - 1.5).abs() < 0.001);
        // 3600 questions at 1s each
        assert!((summary.est_full_hours - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_timing_population_std() {
        let elapsed = [Some(2.0), Some(4.0), Some(4.0), Some(4.0), Some(5.0), Some(5.0), Some(7.0), Some(9.0)];
        let summary = TimingSummary::compute("vilt", &elapsed, 132_062).unwrap();
        assert!((summary.std - 2.0).abs() < 0.001);
        assert!((summary.median - 4.5).abs() < 0.001);
    }

    #[test]
    fn test_timing_all_failed() {
        assert!(TimingSummary::compute("vilt", &[None, None], 100).is_none());
        assert!(TimingSummary::compute("vilt", &[], 100).is_none());
    }

    #[test]
    fn test_accuracy() {
        let acc = AccuracySummary {
            model: "blip".to_string(),
            total: 4,
            exact_matches: 1,
            normalized_matches: 3,
        };
        assert!((acc.raw_accuracy().unwrap() - 0.25).abs() < 0.001);
        assert!((acc.normalized_accuracy().unwrap() - 0.75).abs() < 0.001);
        assert_eq!(acc.format_summary(), "raw: 25.0% | normalized: 75.0% | rows: 4");
    }

    #[test]
    fn test_accuracy_over_no_rows_is_undefined() {
        let empty = AccuracySummary { model: "blip".to_string(), total: 0, exact_matches: 0, normalized_matches: 0 };
        assert_eq!(empty.raw_accuracy(), Err(AnalysisError::EmptyPool));
        assert_eq!(empty.normalized_accuracy(), Err(AnalysisError::EmptyPool));
        assert_eq!(empty.format_summary(), "raw: N/A | normalized: N/A | rows: 0");
    }

    #[test]
    fn test_median_even_and_odd() {
        assert!((median(&[1.0, 2.0, 10.0]) - 2.0).abs() < 0.001);
        assert!((median(&[1.0, 2.0, 3.0, 10.0]) - 2.5).abs() < 0.001);
        assert!((mean(&[1.0, 2.0, 3.0]) - 2.0).abs() < 0.001);
    }
}
