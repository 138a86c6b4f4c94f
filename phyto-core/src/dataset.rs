//! Dataset descriptor consumed by the detection framework's trainer.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::split::Split;

/// `{train, val, test, nc, names}` as written to the trainer's data YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub train: String,
    pub val: String,
    pub test: String,
    pub nc: usize,
    pub names: Vec<String>,
}

impl DatasetDescriptor {
    /// Describe the split directories under `dataset_root`.
    pub fn for_split_root(dataset_root: &Path, names: Vec<String>) -> Self {
        let dir = |split: Split| dataset_root.join(split.dir_name()).display().to_string();
        Self {
            train: dir(Split::Train),
            val: dir(Split::Valid),
            test: dir(Split::Test),
            nc: names.len(),
            names,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize dataset descriptor")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_yaml()?)
            .with_context(|| format!("failed to write dataset descriptor {}", path.display()))?;
        info!(
            "Wrote dataset descriptor ({} classes) to {}",
            self.nc,
            path.display()
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset descriptor {}", path.display()))?;
        let descriptor: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse dataset descriptor {}", path.display()))?;
        anyhow::ensure!(
            descriptor.nc == descriptor.names.len(),
            "dataset descriptor {} declares nc={} but lists {} names",
            path.display(),
            descriptor.nc,
            descriptor.names.len()
        );
        Ok(descriptor)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassNames {
    List(Vec<String>),
    Indexed(BTreeMap<usize, String>),
}

#[derive(Debug, Deserialize)]
struct ClassNamesFile {
    names: ClassNames,
}

/// Parse the `names` key of a class-list YAML document.
///
/// Accepts either a sequence or a mapping of index to name; a mapping must cover
/// `0..n` without gaps.
pub fn parse_class_names(yaml: &str) -> Result<Vec<String>> {
    let file: ClassNamesFile =
        serde_yaml::from_str(yaml).context("class list YAML has no usable `names` key")?;
    match file.names {
        ClassNames::List(names) => Ok(names),
        ClassNames::Indexed(map) => {
            let names: Vec<String> = map.values().cloned().collect();
            for (expected, idx) in map.keys().enumerate() {
                anyhow::ensure!(
                    *idx == expected,
                    "class index {expected} is missing from the `names` mapping"
                );
            }
            Ok(names)
        }
    }
}

/// Read the model's ordered class names from a YAML file.
pub fn load_class_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read class list {}", path.display()))?;
    parse_class_names(&contents).with_context(|| format!("invalid class list {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn names_accept_sequence_and_mapping() {
        let seq = parse_class_names("names:\n  - Apple___healthy\n  - Tomato___healthy\n").unwrap();
        assert_eq!(seq, vec!["Apple___healthy", "Tomato___healthy"]);

        let map =
            parse_class_names("names:\n  1: Tomato___healthy\n  0: Apple___healthy\n").unwrap();
        assert_eq!(map, seq);
    }

    #[test]
    fn gapped_mapping_is_rejected() {
        let err = parse_class_names("names:\n  0: a\n  2: c\n").unwrap_err();
        assert!(err.to_string().contains("class index 1 is missing"));
    }

    #[test]
    fn descriptor_round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let names = vec!["a".to_string(), "b".to_string()];
        let descriptor = DatasetDescriptor::for_split_root(Path::new("datasets"), names.clone());
        assert_eq!(descriptor.nc, 2);
        assert_eq!(descriptor.val, Path::new("datasets").join("valid").display().to_string());

        let path = dir.path().join("plantdata.yaml");
        descriptor.save(&path).unwrap();
        let loaded = DatasetDescriptor::load(&path).unwrap();
        assert_eq!(loaded, descriptor);
        assert_eq!(loaded.names, names);
    }

    #[test]
    fn inconsistent_class_count_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "train: t\nval: v\ntest: x\nnc: 3\nnames: [a, b]\n").unwrap();
        assert!(DatasetDescriptor::load(&path).is_err());
    }
}
