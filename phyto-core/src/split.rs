//! Reproducible train/valid/test partitioning of image/label pairs.
//!
//! The partition is a seeded shuffle, a truncation, and three contiguous ranges whose
//! sizes come from [`compute_split_sizes`]. [`materialize_split`] copies each range into
//! `train/`, `valid/`, and `test/` under a destination root.

use std::{
    collections::HashMap,
    ffi::OsStr,
    fmt, fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use phyto_utils::{config::PairingMode, timing_guard};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    error::PartitionError,
    pairing::{FilePair, discover_pairs, sample},
};

/// One of the three dataset partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Valid, Split::Test];

    /// Directory name used under the destination root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Number of pairs assigned to each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

impl SplitSizes {
    pub fn total(&self) -> usize {
        self.train + self.valid + self.test
    }

    pub fn get(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train,
            Split::Valid => self.valid,
            Split::Test => self.test,
        }
    }

    /// Half-open index range of `split` within the shuffled pair list.
    pub fn range(&self, split: Split) -> std::ops::Range<usize> {
        match split {
            Split::Train => 0..self.train,
            Split::Valid => self.train..self.train + self.valid,
            Split::Test => self.train + self.valid..self.total(),
        }
    }
}

/// Pairs actually copied into each split directory.
pub type SplitCounts = SplitSizes;

/// Shuffle `pairs` with a seeded RNG and keep at most `max_count` of them.
pub fn shuffle_and_truncate(
    mut pairs: Vec<FilePair>,
    seed: u64,
    max_count: usize,
) -> Vec<FilePair> {
    let mut rng = StdRng::seed_from_u64(seed);
    pairs.shuffle(&mut rng);
    pairs.truncate(max_count);
    pairs
}

/// Compute split sizes; rounding loss from `floor` is absorbed by the test split.
pub fn compute_split_sizes(
    total: usize,
    train_ratio: f64,
    valid_ratio: f64,
) -> Result<SplitSizes, PartitionError> {
    let valid_ratio_range = |r: f64| r.is_finite() && (0.0..=1.0).contains(&r);
    if !valid_ratio_range(train_ratio)
        || !valid_ratio_range(valid_ratio)
        || train_ratio + valid_ratio > 1.0
    {
        return Err(PartitionError::InvalidRatios {
            train: train_ratio,
            valid: valid_ratio,
        });
    }

    let train = ((total as f64 * train_ratio).floor() as usize).min(total);
    let valid = ((total as f64 * valid_ratio).floor() as usize).min(total - train);
    Ok(SplitSizes {
        train,
        valid,
        test: total - train - valid,
    })
}

/// Copy every pair into the split directory its index range selects.
///
/// All three split directories are created before any copy starts. Existing files with
/// the same name are overwritten, but two sources that would land on the same name within
/// one split are rejected before anything is written.
pub fn materialize_split(
    pairs: &[FilePair],
    sizes: SplitSizes,
    destination_root: &Path,
) -> Result<SplitCounts, PartitionError> {
    if sizes.total() != pairs.len() {
        return Err(PartitionError::DataMismatch(format!(
            "split sizes sum to {} but {} pair(s) were supplied",
            sizes.total(),
            pairs.len()
        )));
    }
    for split in Split::ALL {
        check_distinct_targets(&pairs[sizes.range(split)], split)?;
    }
    let _guard = timing_guard("phyto_core::materialize_split", log::Level::Debug);

    for split in Split::ALL {
        let dir = destination_root.join(split.dir_name());
        fs::create_dir_all(&dir).map_err(|err| PartitionError::fs("create", &dir, err))?;
    }

    let mut counts = SplitCounts::default();
    for split in Split::ALL {
        let dir = destination_root.join(split.dir_name());
        let chunk = &pairs[sizes.range(split)];
        chunk
            .par_iter()
            .try_for_each(|pair| copy_pair(pair, &dir))?;
        let copied = chunk.len();
        match split {
            Split::Train => counts.train = copied,
            Split::Valid => counts.valid = copied,
            Split::Test => counts.test = copied,
        }
        info!("Files copied to {split} folder: {copied}");
    }
    Ok(counts)
}

fn check_distinct_targets(chunk: &[FilePair], split: Split) -> Result<(), PartitionError> {
    let mut targets: HashMap<&OsStr, &Path> = HashMap::with_capacity(chunk.len() * 2);
    let mut collisions = Vec::new();
    for source in chunk
        .iter()
        .flat_map(|pair| [pair.image.as_path(), pair.label.as_path()])
    {
        // Nameless paths are reported by the copy itself.
        let Some(name) = source.file_name() else {
            continue;
        };
        if let Some(previous) = targets.insert(name, source) {
            collisions.push(format!("{} and {}", previous.display(), source.display()));
        }
    }
    if collisions.is_empty() {
        return Ok(());
    }
    Err(PartitionError::DataMismatch(format!(
        "{} file name collision(s) in {split}: {}",
        collisions.len(),
        sample(&collisions)
    )))
}

fn copy_pair(pair: &FilePair, dir: &Path) -> Result<(), PartitionError> {
    copy_into(&pair.image, dir)?;
    copy_into(&pair.label, dir)
}

fn copy_into(source: &Path, dir: &Path) -> Result<(), PartitionError> {
    let file_name = source.file_name().ok_or_else(|| {
        PartitionError::fs(
            "copy",
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let target = dir.join(file_name);
    fs::copy(source, &target).map_err(|err| PartitionError::fs("copy", source, err))?;
    debug!("{} -> {}", source.display(), target.display());
    Ok(())
}

/// Everything needed to run a partition end to end.
#[derive(Debug, Clone)]
pub struct PartitionRequest {
    pub image_root: PathBuf,
    pub label_root: PathBuf,
    pub destination_root: PathBuf,
    pub pairing: PairingMode,
    pub seed: u64,
    pub max_pairs: usize,
    pub train_ratio: f64,
    pub valid_ratio: f64,
}

/// Outcome of [`partition_dataset`].
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    pub discovered: usize,
    pub kept: usize,
    pub seed: u64,
    pub pairing: &'static str,
    pub sizes: SplitSizes,
    pub counts: SplitCounts,
}

/// Discover, shuffle, size, and materialize a dataset split.
pub fn partition_dataset(request: &PartitionRequest) -> Result<SplitReport, PartitionError> {
    let _guard = timing_guard("phyto_core::partition_dataset", log::Level::Info);
    let pairs = discover_pairs(&request.image_root, &request.label_root, request.pairing)?;
    let discovered = pairs.len();
    let pairs = shuffle_and_truncate(pairs, request.seed, request.max_pairs);
    info!(
        "Number of paired paths: {} (of {discovered} discovered, seed {})",
        pairs.len(),
        request.seed
    );

    let sizes = compute_split_sizes(pairs.len(), request.train_ratio, request.valid_ratio)?;
    let counts = materialize_split(&pairs, sizes, &request.destination_root)?;
    Ok(SplitReport {
        discovered,
        kept: pairs.len(),
        seed: request.seed,
        pairing: request.pairing.as_label(),
        sizes,
        counts,
    })
}
