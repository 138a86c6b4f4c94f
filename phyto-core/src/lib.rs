//! Core PhytoGuard pipeline components.
//!
//! This crate partitions an image/label corpus into train/valid/test splits, binds
//! model class indices to agronomic metadata, and talks to the prediction backend.

/// Export of trained weights out of a run directory.
pub mod checkpoint;
/// Class metadata table and diagnostic formatting.
pub mod classes;
/// Dataset descriptor and class-list YAML handling.
pub mod dataset;
/// Detection records and the reports built from them.
pub mod detection;
/// Typed failures for each component.
pub mod error;
/// Confusion matrix and training history summaries.
pub mod metrics;
/// Image/label file discovery and pairing.
pub mod pairing;
/// Blocking client for the prediction backend.
pub mod predict;
/// Shuffling, split sizing, and split materialization.
pub mod split;

pub use checkpoint::{best_checkpoint_path, export_best_checkpoint};
pub use classes::{ClassRecord, ClassTable, Diagnosis};
pub use dataset::{DatasetDescriptor, load_class_names, parse_class_names};
pub use detection::{
    BoundingBox, Detection, DetectionResult, DiagnosedDetection, ImageReport, diagnose_results,
    load_detection_results,
};
pub use error::{ClassError, PartitionError, PredictError};
pub use metrics::{ClassMetrics, ConfusionMatrix, EpochMetrics, TrainingHistory};
pub use pairing::{FilePair, discover_pairs, list_files};
pub use predict::{
    PredictClient, PredictDetection, PredictOptions, PredictOutcome, PredictReply,
    PredictResponse, interpret_response,
};
pub use split::{
    PartitionRequest, Split, SplitReport, SplitSizes, compute_split_sizes, materialize_split,
    partition_dataset, shuffle_and_truncate,
};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
