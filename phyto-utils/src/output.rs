//! Helpers for naming and writing pipeline output files.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Build `<dir>/<stem of input><suffix>.<ext>`.
///
/// The input's own extension is replaced, so `photos/leaf.png` with suffix `_box` and
/// extension `jpg` becomes `<dir>/leaf_box.jpg`.
pub fn derived_output_path(dir: &Path, input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    let ext = ext.trim_start_matches('.');
    dir.join(format!("{stem}{suffix}.{ext}"))
}

/// Write `bytes` to `path`, creating parent directories first.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn derived_path_replaces_extension() {
        let out = derived_output_path(
            Path::new("images/predict"),
            Path::new("../images/imagen-prueba.png"),
            "_box",
            ".jpg",
        );
        assert_eq!(out, Path::new("images/predict/imagen-prueba_box.jpg"));
    }

    #[test]
    fn write_bytes_creates_parents() {
        let dir = tempdir().expect("tempdir");
        let target = dir.path().join("nested/deeper/out.bin");
        write_bytes(&target, b"payload").expect("write");
        assert_eq!(fs::read(&target).expect("read back"), b"payload");
    }
}
