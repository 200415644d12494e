//! Report writers
//!
//! Every analysis stage saves its tables as CSV in the output directory; the
//! benchmark additionally saves a timestamped JSON summary.
//!
//! | File | Stage |
//! |------|-------|
//! | `distributions.csv` | label distributions |
//! | `coverage.csv`, `top_uncovered.csv` | vocabulary coverage |
//! | `category_balance.csv` | category balance |
//! | `inference_timing.csv`, `answer_comparison.csv`, `benchmark_summary.json` | benchmark |

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::analysis::{BalanceReport, CoverageReport, CoverageResult, DistributionReport, UncoveredAnswer};
use crate::benchmark::{BenchmarkRun, FormatObservations, IssueLog, TimingSummary};

pub const DISTRIBUTIONS_CSV: &str = "distributions.csv";
pub const COVERAGE_CSV: &str = "coverage.csv";
pub const TOP_UNCOVERED_CSV: &str = "top_uncovered.csv";
pub const BALANCE_CSV: &str = "category_balance.csv";
pub const TIMING_CSV: &str = "inference_timing.csv";
pub const COMPARISON_CSV: &str = "answer_comparison.csv";
pub const SUMMARY_JSON: &str = "benchmark_summary.json";

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output dir: {:?}", parent))?;
        }
    }
    Ok(())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    ensure_parent(path)?;
    csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::info!("Saved {:?}", path);
    Ok(())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn write_distributions(path: &Path, report: &DistributionReport) -> Result<()> {
    write_rows(path, report.all_rows())
}

#[derive(Debug, Serialize)]
struct CoverageCsvRow {
    #[serde(rename = "type")]
    kind: &'static str,
    category: &'static str,
    total: usize,
    covered: usize,
    /// Empty for a category without records
    coverage_pct: Option<f64>,
}

impl From<&CoverageResult> for CoverageCsvRow {
    fn from(result: &CoverageResult) -> Self {
        let category = result.category();
        Self {
            kind: category.kind(),
            category: category.label(),
            total: result.total(),
            covered: result.covered(),
            coverage_pct: result.pct().ok().map(|p| round_to(p, 1)),
        }
    }
}

/// Per-category rows, then counting and unique, ending with the `overall,all` row
pub fn write_coverage(path: &Path, report: &CoverageReport) -> Result<()> {
    let rows = report
        .per_category
        .iter()
        .chain(report.counting.iter())
        .chain(std::iter::once(&report.unique))
        .chain(std::iter::once(&report.question_level))
        .map(CoverageCsvRow::from);
    write_rows(path, rows)
}

pub fn write_top_uncovered(path: &Path, answers: &[UncoveredAnswer]) -> Result<()> {
    write_rows(path, answers)
}

#[derive(Debug, Serialize)]
struct BalanceCsvRow<'a> {
    id: u32,
    category: &'a str,
    count: usize,
    pct: f64,
    flag: &'static str,
}

pub fn write_balance(path: &Path, report: &BalanceReport) -> Result<()> {
    let rows = report.rows.iter().map(|row| BalanceCsvRow {
        id: row.id,
        category: &row.category,
        count: row.count,
        pct: round_to(row.pct, 2),
        flag: row.flag.label(),
    });
    write_rows(path, rows)
}

#[derive(Debug, Serialize)]
struct TimingCsvRow<'a> {
    model: &'a str,
    mean: f64,
    median: f64,
    std: f64,
    min: f64,
    max: f64,
    n_samples: usize,
    attempted: usize,
    est_full_hours: f64,
}

/// One row per model that had at least one successful prediction
pub fn write_timing(path: &Path, timing: &[Option<TimingSummary>]) -> Result<()> {
    let rows = timing.iter().flatten().map(|t| TimingCsvRow {
        model: &t.model,
        mean: round_to(t.mean, 4),
        median: round_to(t.median, 4),
        std: round_to(t.std, 4),
        min: round_to(t.min, 4),
        max: round_to(t.max, 4),
        n_samples: t.successes,
        attempted: t.attempted,
        est_full_hours: round_to(t.est_full_hours, 2),
    });
    write_rows(path, rows)
}

/// One row per question with per-model answer, match flags and latency columns
pub fn write_comparison(path: &Path, run: &BenchmarkRun) -> Result<()> {
    let mut writer = csv_writer(path)?;

    let mut header = vec![
        "qid".to_string(),
        "image_id".to_string(),
        "question".to_string(),
        "gt_answer".to_string(),
    ];
    for model in &run.models {
        header.push(format!("{}_answer", model));
        header.push(format!("{}_exact_match", model));
        header.push(format!("{}_normalized_match", model));
        header.push(format!("{}_time", model));
    }
    header.push("structural".to_string());
    header.push("semantic".to_string());
    writer.write_record(&header)?;

    for row in &run.rows {
        let mut record = vec![
            row.question_id.clone(),
            row.image_id.clone(),
            row.question.clone(),
            row.ground_truth.clone(),
        ];
        for result in &row.results {
            record.push(result.predicted_answer.clone());
            record.push(result.exact_match.to_string());
            record.push(result.normalized_match.to_string());
            record.push(
                result
                    .elapsed_seconds
                    .map(|s| format!("{:.4}", s))
                    .unwrap_or_default(),
            );
        }
        record.push(row.structural.clone());
        record.push(row.semantic.clone());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::info!("Saved {:?} ({} rows)", path, run.rows.len());
    Ok(())
}

#[derive(Debug, Serialize)]
struct AccuracyEntry<'a> {
    model: &'a str,
    rows: usize,
    /// `null` when there are no rows
    raw_accuracy: Option<f64>,
    normalized_accuracy: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SummaryConfig {
    seed: u64,
    question_sample_size: usize,
    full_dataset_size: usize,
}

#[derive(Debug, Serialize)]
struct BenchmarkSummary<'a> {
    timestamp: String,
    config: SummaryConfig,
    models: &'a [String],
    questions: usize,
    timing: Vec<&'a TimingSummary>,
    accuracy: Vec<AccuracyEntry<'a>>,
    observations: &'a [FormatObservations],
    issues: &'a IssueLog,
}

/// Save the benchmark summary as pretty JSON
pub fn write_summary(
    path: &Path,
    run: &BenchmarkRun,
    timing: &[Option<TimingSummary>],
    observations: &[FormatObservations],
    seed: u64,
    question_sample_size: usize,
    full_dataset_size: usize,
) -> Result<()> {
    ensure_parent(path)?;

    let accuracy = run.accuracy();
    let summary = BenchmarkSummary {
        timestamp: chrono::Utc::now().to_rfc3339(),
        config: SummaryConfig {
            seed,
            question_sample_size,
            full_dataset_size,
        },
        models: &run.models,
        questions: run.rows.len(),
        timing: timing.iter().flatten().collect(),
        accuracy: accuracy
            .iter()
            .map(|a| AccuracyEntry {
                model: &a.model,
                rows: a.total,
                raw_accuracy: a.raw_accuracy().ok(),
                normalized_accuracy: a.normalized_accuracy().ok(),
            })
            .collect(),
        observations,
        issues: &run.issues,
    };

    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(path, &json).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Saved {:?}", path);
    Ok(())
}
