//! VQA Analysis CLI
//!
//! Exploratory analysis of a GQA-style dataset and a small head-to-head
//! benchmark of VQA models. Every stage runs standalone.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a config with every default spelled out
//! ./vqa-analysis init-config --output analysis.toml
//!
//! # Sample 100 images from the archive (seeded)
//! ./vqa-analysis sample-images --archive data/images.zip
//!
//! # Dataset statistics
//! ./vqa-analysis distributions --dataset data/val_balanced_questions.json
//! ./vqa-analysis coverage --vocabulary vocab/vilt_id2label.json
//! ./vqa-analysis balance --too-small 500 --well-represented 5000
//!
//! # Benchmark the models configured in analysis.toml
//! ./vqa-analysis benchmark --sample-size 50
//! ```
//!
//! ## Configuration
//!
//! Settings come from `--config` (or `./analysis.toml` when present, else
//! built-in defaults). Command-line flags override file values.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

use vqa_analysis::analysis::{
    semantic_within, top_uncovered, BalanceFlag, BalancePlan, BalanceReport, CoverageReport, CoverageResult,
    DistributionReport,
};
use vqa_analysis::benchmark::{run_benchmark, IssueKind};
use vqa_analysis::config::AnalysisConfig;
use vqa_analysis::dataset::{select_benchmark_questions, Dataset, StructuralType};
use vqa_analysis::error::AnalysisError;
use vqa_analysis::images::{read_image_ids, sample_from_archive, write_image_ids, ImageStore};
use vqa_analysis::models::{CommandModel, VqaModel, Vocabulary};
use vqa_analysis::report;

#[derive(Parser)]
#[command(name = "vqa-analysis")]
#[command(about = "Dataset analysis and model benchmarking for visual question answering")]
#[command(version)]
struct Cli {
    /// Path to analysis config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for CSV/JSON reports
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Seed for all random sampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample images from the zip archive and record their ids
    SampleImages {
        /// Zip archive of dataset images
        #[arg(short, long)]
        archive: Option<PathBuf>,

        /// Directory to extract sampled images into
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// File to write sampled image ids to
        #[arg(long)]
        image_ids: Option<PathBuf>,

        /// Number of images to sample
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Structural/semantic distributions, query breakdown and counting questions
    Distributions {
        /// Dataset questions JSON
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Example questions per structural type
        #[arg(long)]
        examples: Option<usize>,
    },

    /// Answer vocabulary coverage of the dataset
    ///
    /// Uses --vocabulary, or the first configured model with a vocabulary.
    Coverage {
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Vocabulary JSON (id2label)
        #[arg(short, long)]
        vocabulary: Option<PathBuf>,

        /// Coverage percentage threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Number of uncovered answers to list
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Size of the named analysis categories and counting overlap
    Balance {
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Flag categories below this many questions
        #[arg(long)]
        too_small: Option<usize>,

        /// Flag categories above this many questions
        #[arg(long)]
        well_represented: Option<usize>,
    },

    /// Run every configured model on questions about the sampled images
    ///
    /// Failures never abort the run; they are collected and printed at the end.
    Benchmark {
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Directory of sampled images
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// File listing sampled image ids
        #[arg(long)]
        image_ids: Option<PathBuf>,

        /// Number of questions to benchmark
        #[arg(short = 'n', long)]
        sample_size: Option<usize>,
    },

    /// Validate a dataset file
    ValidateDataset {
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },

    /// List configured models
    List,

    /// Write the effective configuration to a TOML file
    InitConfig {
        #[arg(long, default_value = "analysis.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::load_default()?,
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.command {
        Commands::SampleImages {
            archive,
            image_dir,
            image_ids,
            count,
        } => {
            override_with(&mut config.image_archive, archive);
            override_with(&mut config.image_dir, image_dir);
            override_with(&mut config.image_ids, image_ids);
            override_with(&mut config.image_sample_size, count);
            sample_images(&config)?;
        }

        Commands::Distributions { dataset, examples } => {
            override_with(&mut config.dataset, dataset);
            override_with(&mut config.examples_per_type, examples);
            distributions(&config)?;
        }

        Commands::Coverage {
            dataset,
            vocabulary,
            threshold,
            top_k,
        } => {
            override_with(&mut config.dataset, dataset);
            override_with(&mut config.coverage_threshold, threshold);
            override_with(&mut config.top_k, top_k);
            coverage(&config, vocabulary.as_deref())?;
        }

        Commands::Balance {
            dataset,
            too_small,
            well_represented,
        } => {
            override_with(&mut config.dataset, dataset);
            override_with(&mut config.balance.too_small, too_small);
            override_with(&mut config.balance.well_represented, well_represented);
            balance(&config)?;
        }

        Commands::Benchmark {
            dataset,
            image_dir,
            image_ids,
            sample_size,
        } => {
            override_with(&mut config.dataset, dataset);
            override_with(&mut config.image_dir, image_dir);
            override_with(&mut config.image_ids, image_ids);
            override_with(&mut config.question_sample_size, sample_size);
            benchmark_models(&config)?;
        }

        Commands::ValidateDataset { dataset } => {
            override_with(&mut config.dataset, dataset);
            validate_dataset(&config.dataset)?;
        }

        Commands::List => {
            list_models(&config);
        }

        Commands::InitConfig { output } => {
            config.save(&output)?;
            println!("Config written to {:?}", output);
        }
    }

    Ok(())
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  {:60}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

fn format_pct(result: Result<f64, AnalysisError>) -> String {
    match result {
        Ok(p) => format!("{:.1}%", p),
        Err(_) => "N/A".to_string(),
    }
}

fn sample_images(config: &AnalysisConfig) -> Result<()> {
    banner("IMAGE SAMPLING");

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    eprintln!(
        "Sampling {} images from {:?} (seed {})...",
        config.image_sample_size, config.image_archive, config.seed
    );
    let sampled = sample_from_archive(&config.image_archive, &config.image_dir, config.image_sample_size, &mut rng)?;
    write_image_ids(&config.image_ids, &sampled.image_ids)?;

    println!("Total images in archive: {}", sampled.archive_images);
    println!("Extracted {} images to {:?}", sampled.image_ids.len(), config.image_dir);
    println!("Saved image ids to {:?}", config.image_ids);
    let preview: Vec<&str> = sampled.image_ids.iter().take(5).map(String::as_str).collect();
    println!("Sample ids (first 5): {}", preview.join(", "));
    Ok(())
}

fn distributions(config: &AnalysisConfig) -> Result<()> {
    banner("QUESTION TYPE DISTRIBUTIONS");

    let dataset = Dataset::load(&config.dataset)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let report = DistributionReport::compute(dataset.records(), config.examples_per_type, &mut rng)?;

    println!("Total questions: {}\n", report.total);

    for (title, rows) in [("Structural types", &report.structural), ("Semantic types", &report.semantic)] {
        println!("{}:", title);
        println!("─────────────────────────────────────────────────────────────────");
        for row in rows {
            println!("  {:12} {:>8}  ({:5.1}%)", row.category, row.count, row.pct);
        }
        println!();
    }

    println!("Query questions ({}) by semantic type:", report.query_count);
    for row in &report.query_semantic {
        println!("  {:12} {:>8}  ({:5.1}% of queries)", row.category, row.count, row.pct);
    }

    println!(
        "\nCounting questions (\"how many\"): {} ({})",
        report.counting_count,
        format_pct(report.counting_pct())
    );
    for row in report.counting_structural.iter().chain(&report.counting_semantic) {
        println!("  {:10} {:12} {:>6}  ({:5.1}%)", row.kind.replace("counting_", ""), row.category, row.count, row.pct);
    }

    println!("\nExample questions:");
    for stype in StructuralType::ALL {
        println!("  [{}]", stype);
        for example in report.examples.iter().filter(|e| e.structural == stype) {
            println!("    Q: {}  A: {}", example.question, example.answer);
        }
    }

    println!("\nSemantic types within verify questions:");
    for (semantic, count) in semantic_within(dataset.records(), StructuralType::Verify).sorted_desc() {
        println!("  {:12} {:>8}", semantic.name(), count);
    }

    report::write_distributions(&config.output_path(report::DISTRIBUTIONS_CSV), &report)?;
    println!("\nSaved {}", report::DISTRIBUTIONS_CSV);
    Ok(())
}

/// Vocabulary from the flag, else from the first model that declares one
fn resolve_vocabulary(config: &AnalysisConfig, explicit: Option<&Path>) -> Result<Vocabulary> {
    if let Some(path) = explicit {
        return Vocabulary::load(path);
    }
    let model = config
        .models
        .iter()
        .find(|m| m.vocabulary.is_some())
        .context("No vocabulary given: pass --vocabulary or configure a model with one")?;
    let path = model.vocabulary.as_deref().context("Model vocabulary path missing")?;
    eprintln!("Using vocabulary of model '{}'", model.name);
    Vocabulary::load(path)
}

fn print_coverage_line(result: &CoverageResult) {
    println!(
        "  {:12} {:>7}/{:<7} {:>7}",
        result.category().label(),
        result.covered(),
        result.total(),
        format_pct(result.pct())
    );
}

fn coverage(config: &AnalysisConfig, vocabulary: Option<&Path>) -> Result<()> {
    banner("ANSWER VOCABULARY COVERAGE");

    let vocabulary = resolve_vocabulary(config, vocabulary)?;
    let dataset = Dataset::load(&config.dataset)?;
    let report = CoverageReport::compute(dataset.records(), &vocabulary)?;

    println!("Vocabulary size: {}", vocabulary.len());
    println!(
        "Unique answers covered:  {}/{} ({})",
        report.unique.covered(),
        report.unique.total(),
        format_pct(report.unique_coverage_pct())
    );
    println!(
        "Question-level coverage: {}/{} ({})\n",
        report.question_level.covered(),
        report.question_level.total(),
        format_pct(report.question_level_coverage_pct())
    );

    println!("By structural type:");
    for result in report.per_category.iter().filter(|c| c.category().kind() == "structural") {
        print_coverage_line(result);
    }
    println!("By semantic type:");
    for result in report.per_category.iter().filter(|c| c.category().kind() == "semantic") {
        print_coverage_line(result);
    }
    match &report.counting {
        Some(counting) => {
            println!("Counting questions:");
            print_coverage_line(counting);
        }
        None => println!("Counting questions: none in dataset"),
    }

    let below = report.below_threshold(config.coverage_threshold);
    println!("\nCategories below {:.0}% coverage:", config.coverage_threshold);
    if below.is_empty() {
        println!("  None");
    }
    for result in below {
        println!("  - {} {} ({})", result.category().kind(), result.category().label(), format_pct(result.pct()));
    }

    let uncovered = top_uncovered(dataset.records(), &vocabulary, config.top_k);
    println!("\nTop {} uncovered answers:", config.top_k);
    for (rank, answer) in uncovered.iter().enumerate() {
        println!("  {:>3}. {:25} {:>7}", rank + 1, answer.answer, answer.count);
    }

    report::write_coverage(&config.output_path(report::COVERAGE_CSV), &report)?;
    report::write_top_uncovered(&config.output_path(report::TOP_UNCOVERED_CSV), &uncovered)?;
    println!("\nSaved {} and {}", report::COVERAGE_CSV, report::TOP_UNCOVERED_CSV);
    Ok(())
}

fn balance(config: &AnalysisConfig) -> Result<()> {
    banner("CATEGORY BALANCE");

    let dataset = Dataset::load(&config.dataset)?;
    let report = BalanceReport::compute(dataset.records(), &BalancePlan::standard(), &config.balance)?;

    println!(
        "Total questions: {}  (too small < {}, well-represented > {})\n",
        report.total, config.balance.too_small, config.balance.well_represented
    );
    for row in &report.rows {
        let flag = match row.flag {
            BalanceFlag::None => String::new(),
            flag => format!("  ⚠ {}", flag.label()),
        };
        println!("  {}. {:22} {:>8}  ({:5.2}%){}", row.id, row.category, row.count, row.pct, flag);
    }

    println!("\nCounting questions: {}", report.counting_total);
    if report.counting_total == 0 {
        println!("  None found: the \"how many\" category is empty in this dataset");
    } else {
        for overlap in &report.overlaps {
            println!("  Overlap with {}. {}: {}", overlap.id, overlap.category, overlap.overlap);
        }
    }

    report::write_balance(&config.output_path(report::BALANCE_CSV), &report)?;
    println!("\nSaved {}", report::BALANCE_CSV);
    Ok(())
}

fn load_models(config: &AnalysisConfig) -> Result<Vec<Box<dyn VqaModel>>> {
    if config.models.is_empty() {
        anyhow::bail!("No models configured. Add [[models]] entries to analysis.toml");
    }
    config
        .models
        .iter()
        .map(|model_config| {
            let model = CommandModel::new(model_config.clone())?;
            Ok(Box::new(model) as Box<dyn VqaModel>)
        })
        .collect()
}

fn benchmark_models(config: &AnalysisConfig) -> Result<()> {
    banner("VQA MODEL BENCHMARK");

    let models = load_models(config)?;
    println!(
        "Models: {}",
        models.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    );

    let dataset = Dataset::load(&config.dataset)?;
    let image_ids = read_image_ids(&config.image_ids)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let selected = select_benchmark_questions(dataset.records(), &image_ids, config.question_sample_size, &mut rng);
    if selected.is_empty() {
        anyhow::bail!("No questions refer to the sampled images in {:?}", config.image_ids);
    }

    eprintln!("\nRunning inference on {} questions...", selected.len());
    let images = ImageStore::new(&config.image_dir);
    let run = run_benchmark(&selected, &models, &images);
    eprintln!("  {} questions completed", run.rows.len());

    let timing = run.timing(config.full_dataset_size);
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│                     INFERENCE TIMING                        │");
    println!("└─────────────────────────────────────────────────────────────┘\n");
    for (name, summary) in run.models.iter().zip(&timing) {
        match summary {
            Some(t) => println!("  {:10} {}", name, t.format_summary()),
            None => println!("  {:10} no successful predictions", name),
        }
    }

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│                     ANSWER COMPARISON                       │");
    println!("└─────────────────────────────────────────────────────────────┘\n");
    for accuracy in run.accuracy() {
        println!("  {:10} {}", accuracy.model, accuracy.format_summary());
    }

    let observations = run.observations(&models);
    println!("\nAnswer format observations:");
    for obs in &observations {
        println!("  {:10} {}", obs.model, obs.format_summary());
    }

    println!("\nFirst rows:");
    for row in run.rows.iter().take(20) {
        let answers: Vec<String> = row
            .results
            .iter()
            .map(|r| format!("{}={}{}", r.model, r.predicted_answer, if r.exact_match { " ✓" } else { "" }))
            .collect();
        println!("  {} | gt={} | {}", row.question, row.ground_truth, answers.join(" | "));
    }

    report::write_timing(&config.output_path(report::TIMING_CSV), &timing)?;
    report::write_comparison(&config.output_path(report::COMPARISON_CSV), &run)?;
    report::write_summary(
        &config.output_path(report::SUMMARY_JSON),
        &run,
        &timing,
        &observations,
        config.seed,
        config.question_sample_size,
        config.full_dataset_size,
    )?;
    println!("\nResults saved to {:?}", config.output_dir);

    println!("\nPractical issues log:");
    if run.issues.is_empty() {
        println!("  None encountered.");
    } else {
        println!(
            "  {} missing resources, {} prediction failures",
            run.issues.count(IssueKind::MissingResource),
            run.issues.count(IssueKind::PredictionFailure)
        );
        for issue in run.issues.issues() {
            println!("  - {}", issue.message);
        }
    }

    Ok(())
}

fn validate_dataset(path: &Path) -> Result<()> {
    println!("Validating {:?}...", path);

    let dataset = Dataset::load(path)?;

    println!("✓ Valid dataset");
    println!("  Questions: {}", dataset.len());
    let images: std::collections::HashSet<&str> = dataset.records().iter().map(|r| r.image_id.as_str()).collect();
    println!("  Images referenced: {}", images.len());
    let answers: std::collections::HashSet<&str> = dataset.answers().collect();
    println!("  Distinct answers: {}", answers.len());
    println!(
        "  Counting questions: {}",
        dataset.records().iter().filter(|r| r.is_counting()).count()
    );

    Ok(())
}

fn list_models(config: &AnalysisConfig) {
    banner("CONFIGURED MODELS");

    if config.models.is_empty() {
        println!("No models configured. Add [[models]] entries to analysis.toml");
        return;
    }
    for model in &config.models {
        println!("  {:12} {} {}", model.name, model.program, model.args.join(" "));
        if let Some(vocab) = &model.vocabulary {
            println!("  {:12} vocabulary: {:?}", "", vocab);
        }
        if let Some(notes) = &model.notes {
            println!("  {:12} {}", "", notes);
        }
    }
}
