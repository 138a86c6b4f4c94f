//! Discovery of image/label file pairs.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{debug, info};
use phyto_utils::config::PairingMode;
use walkdir::WalkDir;

use crate::error::PartitionError;

/// Maximum number of offending stems quoted in a mismatch error.
const MISMATCH_SAMPLE: usize = 5;

/// An image file and the label file that annotates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePair {
    pub image: PathBuf,
    pub label: PathBuf,
}

impl FilePair {
    pub fn new(image: impl Into<PathBuf>, label: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            label: label.into(),
        }
    }
}

/// Recursively list regular files under `root`, sorted by full path.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, PartitionError> {
    if !root.is_dir() {
        return Err(PartitionError::fs(
            "list directory",
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            PartitionError::fs("walk", path, err.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Discover image/label pairs under two roots.
///
/// With [`PairingMode::Stem`] every image must have exactly one label sharing its file
/// stem. With [`PairingMode::Positional`] the sorted listings are zipped by position and
/// must have equal length. Pairs come back ordered by image path.
pub fn discover_pairs(
    image_root: &Path,
    label_root: &Path,
    mode: PairingMode,
) -> Result<Vec<FilePair>, PartitionError> {
    let images = list_files(image_root)?;
    let labels = list_files(label_root)?;
    info!(
        "Found {} image(s) under {} and {} label(s) under {}",
        images.len(),
        image_root.display(),
        labels.len(),
        label_root.display()
    );

    match mode {
        PairingMode::Positional => pair_by_position(images, labels),
        PairingMode::Stem => pair_by_stem(images, labels),
    }
}

/// Zip two independently sorted listings.
pub fn pair_by_position(
    images: Vec<PathBuf>,
    labels: Vec<PathBuf>,
) -> Result<Vec<FilePair>, PartitionError> {
    if images.len() != labels.len() {
        return Err(PartitionError::DataMismatch(format!(
            "{} image(s) but {} label(s); positional pairing needs equal counts",
            images.len(),
            labels.len()
        )));
    }
    Ok(images
        .into_iter()
        .zip(labels)
        .map(|(image, label)| FilePair { image, label })
        .collect())
}

/// Match images and labels by file stem.
pub fn pair_by_stem(
    images: Vec<PathBuf>,
    labels: Vec<PathBuf>,
) -> Result<Vec<FilePair>, PartitionError> {
    let image_index = index_by_stem(images, "image")?;
    let mut label_index = index_by_stem(labels, "label")?;

    let mut pairs = Vec::with_capacity(image_index.len());
    let mut unlabeled = Vec::new();
    for (stem, image) in image_index {
        match label_index.remove(&stem) {
            Some(label) => pairs.push(FilePair { image, label }),
            None => unlabeled.push(stem),
        }
    }
    let orphans: Vec<String> = label_index.into_keys().collect();

    if !unlabeled.is_empty() || !orphans.is_empty() {
        let mut parts = Vec::new();
        if !unlabeled.is_empty() {
            parts.push(format!(
                "{} image(s) without a label ({})",
                unlabeled.len(),
                sample(&unlabeled)
            ));
        }
        if !orphans.is_empty() {
            parts.push(format!(
                "{} label(s) without an image ({})",
                orphans.len(),
                sample(&orphans)
            ));
        }
        return Err(PartitionError::DataMismatch(parts.join("; ")));
    }

    pairs.sort_by(|a, b| a.image.cmp(&b.image));
    debug!("Paired {} file(s) by stem", pairs.len());
    Ok(pairs)
}

fn index_by_stem(
    paths: Vec<PathBuf>,
    kind: &str,
) -> Result<BTreeMap<String, PathBuf>, PartitionError> {
    let mut index = BTreeMap::new();
    let mut duplicates = Vec::new();
    for path in paths {
        let stem = file_stem(&path);
        if let Some(previous) = index.insert(stem.clone(), path) {
            duplicates.push(format!("{stem} ({})", previous.display()));
        }
    }
    if !duplicates.is_empty() {
        return Err(PartitionError::DataMismatch(format!(
            "{} duplicate {kind} stem(s): {}",
            duplicates.len(),
            sample(&duplicates)
        )));
    }
    Ok(index)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn sample(items: &[String]) -> String {
    let mut shown: Vec<&str> = items
        .iter()
        .take(MISMATCH_SAMPLE)
        .map(String::as_str)
        .collect();
    if items.len() > MISMATCH_SAMPLE {
        shown.push("...");
    }
    shown.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    #[test]
    fn stem_pairing_matches_across_nested_dirs() {
        let dir = tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        touch(&images.join("apple/a1.jpg"));
        touch(&images.join("corn/c1.JPG"));
        touch(&labels.join("c1.txt"));
        touch(&labels.join("a1.txt"));

        let pairs = discover_pairs(&images, &labels, PairingMode::Stem).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].image, images.join("apple/a1.jpg"));
        assert_eq!(pairs[0].label, labels.join("a1.txt"));
        assert_eq!(pairs[1].label, labels.join("c1.txt"));
    }

    #[test]
    fn stem_pairing_reports_unmatched_files() {
        let images = vec![PathBuf::from("i/a.jpg"), PathBuf::from("i/b.jpg")];
        let labels = vec![PathBuf::from("l/a.txt"), PathBuf::from("l/z.txt")];
        let err = pair_by_stem(images, labels).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("1 image(s) without a label (b)"), "{message}");
        assert!(message.contains("1 label(s) without an image (z)"), "{message}");
    }

    #[test]
    fn stem_pairing_rejects_duplicate_stems() {
        let images = vec![PathBuf::from("x/a.jpg"), PathBuf::from("y/a.png")];
        let labels = vec![PathBuf::from("l/a.txt")];
        let err = pair_by_stem(images, labels).unwrap_err();
        assert!(matches!(err, PartitionError::DataMismatch(ref m) if m.contains("duplicate image")));
    }

    #[test]
    fn positional_pairing_zips_sorted_lists() {
        let dir = tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        touch(&images.join("b.jpg"));
        touch(&images.join("a.jpg"));
        touch(&labels.join("2.txt"));
        touch(&labels.join("1.txt"));

        let pairs = discover_pairs(&images, &labels, PairingMode::Positional).unwrap();
        assert_eq!(pairs[0], FilePair::new(images.join("a.jpg"), labels.join("1.txt")));
        assert_eq!(pairs[1], FilePair::new(images.join("b.jpg"), labels.join("2.txt")));
    }

    #[test]
    fn positional_pairing_rejects_unequal_counts() {
        let err = pair_by_position(vec![PathBuf::from("a.jpg")], Vec::new()).unwrap_err();
        assert!(matches!(err, PartitionError::DataMismatch(_)));
    }

    #[test]
    fn missing_root_is_a_filesystem_error() {
        let dir = tempdir().unwrap();
        let err = discover_pairs(
            &dir.path().join("absent"),
            dir.path(),
            PairingMode::Stem,
        )
        .unwrap_err();
        assert!(matches!(err, PartitionError::Filesystem { .. }));
    }
}
