//! Typed failures raised by the core pipeline components.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Failures raised while pairing, shuffling, or materializing a dataset split.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("image/label mismatch: {0}")]
    DataMismatch(String),
    #[error(
        "invalid split ratios (train={train}, valid={valid}); each must lie in [0, 1] and sum to at most 1"
    )]
    InvalidRatios { train: f64, valid: f64 },
}

impl PartitionError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Failures raised by the class metadata table.
#[derive(Debug, Error)]
pub enum ClassError {
    #[error("class index {index} is out of range for a table of {len} classes")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("class table does not match the model classes: {0}")]
    Mismatch(String),
    #[error("failed to parse class data from {origin}: {message}")]
    Parse { origin: String, message: String },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures raised while talking to the prediction backend.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("could not reach backend at {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend at {url} did not answer within {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("backend returned HTTP {status}: {body_prefix}")]
    Http {
        status: u16,
        /// Response headers, when the reply came over the wire.
        headers: Vec<(String, String)>,
        body_prefix: String,
    },
    #[error("backend response could not be decoded: {message}")]
    Decode { message: String, body_prefix: String },
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PredictError {
    /// Short label for the failure family, used in user-facing reports.
    pub fn category(&self) -> &'static str {
        match self {
            PredictError::Network { .. } | PredictError::Timeout { .. } => "unreachable",
            PredictError::Http { .. } => "http-error",
            PredictError::Decode { .. } => "undecodable",
            PredictError::Io { .. } => "local-io",
        }
    }
}
