//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use phyto_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};

use crate::args::{Cli, Command};

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, cli: &Cli) {
    if cli.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = cli.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }
    if let Some(table) = cli.classes.as_ref() {
        settings.paths.class_table = Some(table.clone());
    }

    match &cli.command {
        Command::Split(args) => {
            let split = &mut settings.split;
            if let Some(seed) = args.seed {
                split.seed = seed;
            }
            if let Some(max_pairs) = args.max_pairs {
                split.max_pairs = max_pairs;
            }
            if let Some(ratio) = args.train_ratio {
                split.train_ratio = ratio;
            }
            if let Some(ratio) = args.valid_ratio {
                split.valid_ratio = ratio;
            }
            if let Some(mode) = args.pairing {
                split.pairing = mode;
            }
            let paths = &mut settings.paths;
            if let Some(images) = args.images.as_ref() {
                paths.image_root = Some(images.clone());
            }
            if let Some(labels) = args.labels.as_ref() {
                paths.label_root = Some(labels.clone());
            }
            if let Some(output) = args.output.as_ref() {
                paths.dataset_root = output.clone();
            }
        }
        Command::DatasetConfig(args) => {
            let paths = &mut settings.paths;
            if let Some(names) = args.names.as_ref() {
                paths.class_names = names.clone();
            }
            if let Some(root) = args.dataset_root.as_ref() {
                paths.dataset_root = root.clone();
            }
            if let Some(output) = args.output.as_ref() {
                paths.dataset_config = output.clone();
            }
        }
        Command::Export(args) => {
            if let Some(run_dir) = args.run_dir.as_ref() {
                settings.paths.run_dir = run_dir.clone();
            }
            if let Some(output) = args.output.as_ref() {
                settings.paths.checkpoint = output.clone();
            }
        }
        Command::Predict(args) => {
            let backend = &mut settings.backend;
            if let Some(url) = args.url.as_ref() {
                backend.url = url.clone();
            }
            if let Some(timeout) = args.timeout {
                backend.timeout_secs = timeout;
            }
            if let Some(dir) = args.predict_dir.as_ref() {
                backend.predict_dir = dir.clone();
            }
            if let Some(dir) = args.upload_dir.as_ref() {
                backend.upload_dir = Some(dir.clone());
            }
        }
        Command::Describe(_)
        | Command::Classes(_)
        | Command::Report(_)
        | Command::Summary(_)
        | Command::Eval(_) => {}
    }
}
