//! Reports over evaluation and training artifacts exported by the detection framework.
//!
//! Nothing here computes detections; the confusion matrix and per-epoch history are read
//! from the framework's output and summarized.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

/// Confusion matrix with rows indexed by true class and columns by predicted class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub names: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

/// Precision and recall for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    /// Number of true instances of the class (row sum).
    pub support: f64,
}

impl ConfusionMatrix {
    /// Build and validate a matrix; it must be square and match `names`.
    pub fn new(names: Vec<String>, matrix: Vec<Vec<f64>>) -> Result<Self> {
        let cm = Self { names, matrix };
        cm.validate()?;
        Ok(cm)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read confusion matrix {}", path.display()))?;
        let cm: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse confusion matrix {}", path.display()))?;
        cm.validate()
            .with_context(|| format!("invalid confusion matrix {}", path.display()))?;
        Ok(cm)
    }

    fn validate(&self) -> Result<()> {
        let n = self.matrix.len();
        anyhow::ensure!(
            self.names.len() == n,
            "{} class names for a {n}-row matrix",
            self.names.len()
        );
        for (idx, row) in self.matrix.iter().enumerate() {
            anyhow::ensure!(row.len() == n, "row {idx} has {} columns, expected {n}", row.len());
            anyhow::ensure!(
                row.iter().all(|v| v.is_finite() && *v >= 0.0),
                "row {idx} contains negative or non-finite counts"
            );
        }
        Ok(())
    }

    /// Each row divided by its sum. Rows without samples stay all zero.
    pub fn normalized(&self) -> Vec<Vec<f64>> {
        self.matrix
            .iter()
            .map(|row| {
                let total: f64 = row.iter().sum();
                if total > 0.0 {
                    row.iter().map(|v| v / total).collect()
                } else {
                    vec![0.0; row.len()]
                }
            })
            .collect()
    }

    /// Precision (diagonal over column sum) and recall (diagonal over row sum) per class.
    /// A zero denominator yields 0.
    pub fn per_class(&self) -> Vec<ClassMetrics> {
        let n = self.matrix.len();
        let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };
        (0..n)
            .map(|i| {
                let tp = self.matrix[i][i];
                let row_sum: f64 = self.matrix[i].iter().sum();
                let col_sum: f64 = self.matrix.iter().map(|row| row[i]).sum();
                ClassMetrics {
                    name: self.names[i].clone(),
                    precision: ratio(tp, col_sum),
                    recall: ratio(tp, row_sum),
                    support: row_sum,
                }
            })
            .collect()
    }

    /// Fraction of all samples on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let total: f64 = self.matrix.iter().flatten().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let diagonal: f64 = (0..self.matrix.len()).map(|i| self.matrix[i][i]).sum();
        diagonal / total
    }
}

/// One row of the framework's `results.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub epoch: u32,
    pub box_loss: f64,
    pub cls_loss: f64,
    pub map50: f64,
    pub map50_95: f64,
}

/// Per-epoch training history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

const COL_EPOCH: &str = "epoch";
const COL_BOX_LOSS: &str = "train/box_loss";
const COL_CLS_LOSS: &str = "train/cls_loss";
const COL_MAP50: &str = "metrics/mAP50(B)";
const COL_MAP50_95: &str = "metrics/mAP50-95(B)";

impl TrainingHistory {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read training results {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid training results {}", path.display()))
    }

    /// Parse CSV text whose header carries the framework's column names (padding allowed).
    pub fn parse(csv_text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(csv_text.as_bytes());
        let headers = reader.headers().context("missing CSV header")?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| format!("missing column `{name}`"))
        };
        let cols = [
            column(COL_EPOCH)?,
            column(COL_BOX_LOSS)?,
            column(COL_CLS_LOSS)?,
            column(COL_MAP50)?,
            column(COL_MAP50_95)?,
        ];

        let mut epochs = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("failed to read row {}", row_idx + 1))?;
            let field = |idx: usize| -> Result<f64> { parse_field(&record, cols[idx], row_idx + 1) };
            epochs.push(EpochMetrics {
                epoch: parse_epoch(&record, cols[0], row_idx + 1)?,
                box_loss: field(1)?,
                cls_loss: field(2)?,
                map50: field(3)?,
                map50_95: field(4)?,
            });
        }
        Ok(Self { epochs })
    }

    /// Epoch with the highest mAP@0.5:0.95; earliest wins ties.
    pub fn best_epoch(&self) -> Option<&EpochMetrics> {
        self.epochs.iter().fold(None, |best, e| match best {
            Some(b) if b.map50_95 >= e.map50_95 => Some(b),
            _ => Some(e),
        })
    }

    pub fn last_epoch(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

fn raw_field(record: &StringRecord, column: usize, row: usize) -> Result<&str> {
    record
        .get(column)
        .with_context(|| format!("row {row} is missing column {column}"))
}

fn parse_field(record: &StringRecord, column: usize, row: usize) -> Result<f64> {
    let raw = raw_field(record, column, row)?;
    raw.parse::<f64>()
        .with_context(|| format!("row {row}: '{raw}' is not a number"))
}

fn parse_epoch(record: &StringRecord, column: usize, row: usize) -> Result<u32> {
    let raw = raw_field(record, column, row)?;
    raw.parse::<u32>()
        .with_context(|| format!("row {row}: epoch '{raw}' is not a non-negative integer"))
}

impl fmt::Display for TrainingHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Épocas: {}", self.epochs.len())?;
        if let Some(last) = self.last_epoch() {
            writeln!(
                f,
                "Última época {}: box_loss={:.4} cls_loss={:.4} mAP@0.5={:.4} mAP@0.5:0.95={:.4}",
                last.epoch, last.box_loss, last.cls_loss, last.map50, last.map50_95
            )?;
        }
        if let Some(best) = self.best_epoch() {
            write!(
                f,
                "Mejor época {}: mAP@0.5={:.4} mAP@0.5:0.95={:.4}",
                best.epoch, best.map50, best.map50_95
            )?;
        }
        Ok(())
    }
}
