//! Command-line argument definitions for the `phytoguard` binary.

use clap::{ArgAction, Args, Parser, Subcommand};
use phyto_utils::PairingMode;
use std::path::PathBuf;

/// Dataset preparation and diagnostics for the PhytoGuard plant-disease detector.
#[derive(Debug, Parser)]
#[command(name = "phytoguard", author, version, about)]
pub struct Cli {
    /// Optional settings JSON. Defaults to `config/phytoguard.json` when present, otherwise built-in values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Class metadata table (JSON) replacing the built-in one.
    #[arg(long, global = true, value_name = "TABLE")]
    pub classes: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, global = true, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pair images with labels, shuffle, and copy them into train/valid/test.
    Split(SplitArgs),
    /// Write the dataset descriptor YAML consumed by the trainer.
    DatasetConfig(DatasetConfigArgs),
    /// Print the diagnostic block for one class index.
    Describe(DescribeArgs),
    /// List the class metadata table, optionally checking it against a model's classes.
    Classes(ClassesArgs),
    /// Build diagnostic reports from exported detection results.
    Report(ReportArgs),
    /// Copy the best checkpoint of a training run.
    Export(ExportArgs),
    /// Summarize a training run's per-epoch results.
    Summary(SummaryArgs),
    /// Normalize a confusion matrix and print per-class precision and recall.
    Eval(EvalArgs),
    /// Send one image to the prediction backend and report what came back.
    Predict(PredictArgs),
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Directory containing the source images.
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Directory containing the source label files.
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Destination root for the split directories.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Shuffle seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of pairs kept after shuffling.
    #[arg(long)]
    pub max_pairs: Option<usize>,

    /// Fraction of pairs assigned to training.
    #[arg(long)]
    pub train_ratio: Option<f64>,

    /// Fraction of pairs assigned to validation.
    #[arg(long)]
    pub valid_ratio: Option<f64>,

    /// How images are matched with labels (stem or positional).
    #[arg(long, value_name = "MODE")]
    pub pairing: Option<PairingMode>,

    /// Write the split report to a JSON file.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DatasetConfigArgs {
    /// YAML file listing the model's class names.
    #[arg(long)]
    pub names: Option<PathBuf>,

    /// Root holding the split directories.
    #[arg(long)]
    pub dataset_root: Option<PathBuf>,

    /// Output path of the descriptor.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Zero-based class index reported by the model.
    #[arg(allow_negative_numbers = true)]
    pub index: i64,
}

#[derive(Debug, Args)]
pub struct ClassesArgs {
    /// Check the table against a model class list (YAML with a `names` key).
    #[arg(long, value_name = "NAMES_YAML")]
    pub validate: Option<PathBuf>,

    /// Print the table as JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// JSON array of per-image detection results.
    pub detections: PathBuf,

    /// Write the structured report to a JSON file instead of printing text.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Training run directory containing `weights/best.pt`.
    #[arg(long)]
    pub run_dir: Option<PathBuf>,

    /// Destination of the exported checkpoint.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Per-epoch results CSV. Defaults to `results.csv` in the configured run directory.
    pub results: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Confusion matrix JSON (`names` and `matrix`).
    pub confusion: PathBuf,

    /// Write the normalized matrix and per-class metrics to a JSON file.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// JPEG image to upload.
    pub image: PathBuf,

    /// Full URL of the `/predict` endpoint.
    #[arg(long)]
    pub url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory receiving the annotated image.
    #[arg(long)]
    pub predict_dir: Option<PathBuf>,

    /// Directory receiving a copy of the uploaded image.
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,
}
