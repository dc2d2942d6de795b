//! check_performance - score detector output against benchmark annotations
//!
//! Writes `performance.json` (and optionally `performance.csv`) with per-IoU
//! threshold confusion counts, precision and recall for the overall and
//! leading-vehicle buckets.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use detection_eval::metrics::Bucket;
use detection_eval::{evaluate, Dataset, EvaluationConfig, MatchingStrategy, ThresholdSweep};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Detection result file (JSON keyed by image name).
    #[arg(long, requires = "benchmark")]
    detected: Option<PathBuf>,
    /// Benchmark annotation file (JSON keyed by image name).
    #[arg(long, requires = "detected")]
    benchmark: Option<PathBuf>,
    /// Root folder holding one sub-folder per sequence.
    #[arg(long, conflicts_with_all = ["detected", "benchmark"], requires = "model")]
    root: Option<PathBuf>,
    /// Model name used in per-folder detection file names.
    #[arg(long)]
    model: Option<String>,
    /// Evaluation config file (JSON).
    #[arg(long, env = "DETECTION_EVAL_CONFIG")]
    config: Option<PathBuf>,
    /// Comma-separated IoU thresholds, overriding the config.
    #[arg(long)]
    thresholds: Option<String>,
    /// Matching discipline: all-pairs or greedy.
    #[arg(long)]
    matching: Option<MatchingStrategy>,
    /// Re-derive detected categories with the leading-strip heuristic.
    #[arg(long)]
    reclassify: bool,
    /// With --reclassify, keep only the nearest leading detection per frame.
    #[arg(long, requires = "reclassify")]
    nearest_leading: bool,
    /// Output directory.
    #[arg(long, default_value = ".")]
    output: PathBuf,
    /// Also write performance.csv.
    #[arg(long)]
    csv: bool,
    /// Evaluate thresholds one after another.
    #[arg(long)]
    sequential: bool,
    /// Log per-threshold details.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &args.config {
        Some(path) => EvaluationConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EvaluationConfig::default(),
    };
    if let Some(list) = &args.thresholds {
        config.thresholds = ThresholdSweep::parse(list).context("parsing --thresholds")?;
    }
    if let Some(matching) = args.matching {
        config.matching = matching;
    }
    if args.sequential {
        config.parallel = false;
    }

    let mut dataset = match (&args.benchmark, &args.detected, &args.root, &args.model) {
        (Some(benchmark), Some(detected), _, _) => Dataset::from_files(benchmark, detected)
            .with_context(|| {
                format!(
                    "loading {} and {}",
                    benchmark.display(),
                    detected.display()
                )
            })?,
        (_, _, Some(root), Some(model)) => Dataset::from_folder_layout(root, model)
            .with_context(|| format!("loading folders under {}", root.display()))?,
        _ => bail!("either --benchmark and --detected, or --root and --model, are required"),
    };
    if dataset.is_empty() {
        bail!("no frames to evaluate");
    }
    if !dataset.rejected.is_empty() {
        log::warn!("{} images rejected as malformed", dataset.rejected.len());
    }
    if args.reclassify {
        dataset.reclassify_detections(&config.classifier, args.nearest_leading);
    }

    let report = evaluate(&dataset.frames, &config)?;

    let json_path = args.output.join("performance.json");
    report
        .write_json(&json_path)
        .with_context(|| format!("writing {}", json_path.display()))?;
    log::info!("wrote {}", json_path.display());

    if args.csv {
        let csv_path = args.output.join("performance.csv");
        report
            .write_csv(&csv_path)
            .with_context(|| format!("writing {}", csv_path.display()))?;
        log::info!("wrote {}", csv_path.display());
    }

    for entry in report.entries() {
        let mut line = format!("IoU {:>5}:", entry.threshold);
        for bucket in Bucket::ALL {
            let m = entry.bucket(bucket);
            let precision = m
                .precision
                .map(|p| format!("{:.3}", p))
                .unwrap_or_else(|| "n/a".to_string());
            line.push_str(&format!(
                "  {} P={} R={:.3}{}",
                bucket.name(),
                precision,
                m.recall,
                if m.recall_defaulted { "*" } else { "" }
            ));
        }
        println!("{}", line);
    }

    Ok(())
}
