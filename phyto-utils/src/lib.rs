//! Common helpers shared across PhytoGuard crates.

/// Application configuration and settings management.
pub mod config;
/// Test fixture loading and path resolution.
pub mod fixtures;
/// Output path and file writing helpers.
pub mod output;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{
    AppSettings, BackendSettings, DEFAULT_BACKEND_TIMEOUT_SECS, PairingMode, PathSettings,
    SplitSettings, TelemetrySettings,
};
pub use fixtures::{fixture_path, fixtures_dir, load_fixture_json};
pub use output::{derived_output_path, write_bytes};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    telemetry_level, timing_guard,
};

/// Log target used by [`TimingGuard`] output.
pub const TELEMETRY_TARGET: &str = "phytoguard::telemetry";

/// Initialize logging once for CLI and test environments.
///
/// This function respects the `RUST_LOG` environment variable if it is set.
/// Otherwise, it falls back to the provided default filter level.
///
/// # Arguments
///
/// * `default_filter` - The `LevelFilter` to use if `RUST_LOG` is not set.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
///
/// # Arguments
///
/// * `path` - The path to validate and normalize.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
