//! Shared configuration types consumed across the PhytoGuard workspace.
//!
//! These structures provide a common representation for dataset splitting, pipeline paths,
//! prediction backend access, and telemetry that can be serialized to disk and reused by the
//! CLI and tests.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Seed used for the dataset shuffle when none is configured.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Upper bound on the number of pairs kept after shuffling.
pub const DEFAULT_MAX_PAIRS: usize = 54_293;

/// Prediction request timeout, in seconds, when none is configured.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

/// How image files are associated with their label files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    /// Match files by stem and fail on any unmatched or duplicated stem.
    #[default]
    Stem,
    /// Sort both listings and zip them by position.
    Positional,
}

impl PairingMode {
    pub fn as_label(self) -> &'static str {
        match self {
            PairingMode::Stem => "stem",
            PairingMode::Positional => "positional",
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for PairingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stem" | "name" => Ok(PairingMode::Stem),
            "positional" | "position" | "sorted" => Ok(PairingMode::Positional),
            other => Err(format!(
                "invalid pairing mode '{other}'; expected 'stem' or 'positional'"
            )),
        }
    }
}

/// Parameters controlling how the dataset is shuffled and partitioned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitSettings {
    /// Seed for the shuffle; identical seeds over identical inputs give identical splits.
    pub seed: u64,
    /// Maximum number of pairs kept after shuffling.
    pub max_pairs: usize,
    /// Fraction of pairs assigned to `train/`.
    pub train_ratio: f64,
    /// Fraction of pairs assigned to `valid/`. The remainder goes to `test/`.
    pub valid_ratio: f64,
    /// Image/label association strategy.
    pub pairing: PairingMode,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SPLIT_SEED,
            max_pairs: DEFAULT_MAX_PAIRS,
            train_ratio: 0.70,
            valid_ratio: 0.20,
            pairing: PairingMode::Stem,
        }
    }
}

/// Filesystem locations used by the pipeline steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathSettings {
    /// Root directory holding the source images.
    pub image_root: Option<PathBuf>,
    /// Root directory holding the source label files.
    pub label_root: Option<PathBuf>,
    /// Destination for the `train/`, `valid/`, `test/` directories.
    pub dataset_root: PathBuf,
    /// YAML file listing the model's class names under `names`.
    pub class_names: PathBuf,
    /// Where the dataset descriptor consumed by the trainer is written.
    pub dataset_config: PathBuf,
    /// Training run directory produced by the detection framework.
    pub run_dir: PathBuf,
    /// Destination of the exported checkpoint.
    pub checkpoint: PathBuf,
    /// Optional class metadata table replacing the built-in one.
    pub class_table: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            image_root: None,
            label_root: None,
            dataset_root: PathBuf::from("datasets"),
            class_names: PathBuf::from("classes.yaml"),
            dataset_config: PathBuf::from("plantdata.yaml"),
            run_dir: PathBuf::from("runs/detect/plantvillage_yolo_train3"),
            checkpoint: PathBuf::from("PhytoGuard.pt"),
            class_table: None,
        }
    }
}

/// Prediction backend endpoint and client behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendSettings {
    /// Full URL of the `/predict` endpoint.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Directory receiving annotated images returned by the backend.
    pub predict_dir: PathBuf,
    /// Optional directory receiving a copy of each uploaded image.
    pub upload_dir: Option<PathBuf>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/predict".to_string(),
            timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            predict_dir: PathBuf::from("images/predict"),
            upload_dir: None,
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent settings consumed by the CLI.
///
/// Every section falls back to its defaults when missing from the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    /// Dataset shuffle and split parameters.
    pub split: SplitSettings,
    /// Pipeline file locations.
    pub paths: PathSettings,
    /// Prediction backend access.
    pub backend: BackendSettings,
    /// Telemetry and diagnostics preferences.
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// If the file does not exist or cannot be parsed, an error is returned.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;
        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON.
    ///
    /// This will overwrite the file if it already exists.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// Returns the default path for persisted settings (`config/phytoguard.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/phytoguard.json"))
        .unwrap_or_else(|_| PathBuf::from("config/phytoguard.json"))
}
