//! Export of the best checkpoint from a training run directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;

use crate::error::PartitionError;

/// Location of the best weights inside a framework run directory.
pub fn best_checkpoint_path(run_dir: &Path) -> PathBuf {
    run_dir.join("weights").join("best.pt")
}

/// Copy `<run_dir>/weights/best.pt` to `destination`, returning the bytes copied.
pub fn export_best_checkpoint(run_dir: &Path, destination: &Path) -> Result<u64, PartitionError> {
    let source = best_checkpoint_path(run_dir);
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| PartitionError::fs("create", parent, err))?;
    }
    let bytes =
        fs::copy(&source, destination).map_err(|err| PartitionError::fs("copy", &source, err))?;
    info!(
        "Exported {} ({bytes} bytes) as {}",
        source.display(),
        destination.display()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_best_weights() {
        let dir = tempdir().unwrap();
        let run = dir.path().join("runs/detect/train");
        fs::create_dir_all(run.join("weights")).unwrap();
        fs::write(best_checkpoint_path(&run), b"weights").unwrap();

        let dest = dir.path().join("export/PhytoGuard.pt");
        let bytes = export_best_checkpoint(&run, &dest).unwrap();
        assert_eq!(bytes, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"weights");
    }

    #[test]
    fn missing_checkpoint_names_the_source() {
        let dir = tempdir().unwrap();
        let err = export_best_checkpoint(dir.path(), &dir.path().join("out.pt")).unwrap_err();
        assert!(err.to_string().contains("best.pt"), "{err}");
    }
}
