use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const FIXTURE_ENV: &str = "PHYTOGUARD_FIXTURE_ROOT";

/// Resolve the root directory that stores project fixtures.
///
/// This function searches for a `fixtures` directory in the following order:
/// 1. The path specified by the `PHYTOGUARD_FIXTURE_ROOT` environment variable.
/// 2. Ancestor directories of the current crate's manifest directory.
///
/// Returns an error if the directory cannot be found.
pub fn fixtures_dir() -> Result<PathBuf> {
    if let Ok(value) = env::var(FIXTURE_ENV) {
        return Ok(PathBuf::from(value));
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join("fixtures");
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    anyhow::bail!(
        "fixtures directory not found starting from {}",
        manifest_dir.display()
    );
}

/// Resolve a path inside the fixture folder, failing when it does not exist.
///
/// # Arguments
///
/// * `relative` - A relative path to a file within the `fixtures` directory.
pub fn fixture_path<P: AsRef<Path>>(relative: P) -> Result<PathBuf> {
    let relative = relative.as_ref();
    let root = fixtures_dir()?;
    let full = root.join(relative);
    anyhow::ensure!(
        full.exists(),
        "fixture {} does not exist under {}",
        relative.display(),
        root.display()
    );
    Ok(full)
}

/// Load fixture JSON into a strongly-typed structure.
///
/// # Arguments
///
/// * `relative` - A relative path to a JSON file within the `fixtures` directory.
/// * `T` - The type to deserialize the JSON into.
pub fn load_fixture_json<P, T>(relative: P) -> Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = fixture_path(relative)?;
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read JSON fixture {}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse JSON fixture {}", path.display()))?;
    Ok(value)
}
