//! Detection records produced by the external detection framework and the diagnostic
//! reports built from them.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    classes::{ClassRecord, ClassTable},
    error::ClassError,
};

/// Axis-aligned box in corner form `(x1, y1, x2, y2)`, serialized as a 4-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(alias = "cls")]
    pub class_index: i64,
    #[serde(alias = "conf")]
    pub confidence: f32,
    #[serde(alias = "xyxy")]
    pub bbox: BoundingBox,
}

/// All detections the framework reported for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub image: String,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// Load exported detection results (a JSON array of [`DetectionResult`]).
pub fn load_detection_results<P: AsRef<Path>>(path: P) -> Result<Vec<DetectionResult>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read detections {}", path.display()))?;
    let results = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse detections JSON at {}", path.display()))?;
    Ok(results)
}

/// A detection bound to its class metadata.
#[derive(Debug, Clone)]
pub struct DiagnosedDetection<'t> {
    pub detection: Detection,
    pub record: &'t ClassRecord,
}

impl DiagnosedDetection<'_> {
    /// `Detectado: <name> (Confianza: 0.93)`
    pub fn detection_line(&self) -> String {
        detection_line(self.record, self.detection.confidence)
    }
}

impl fmt::Display for DiagnosedDetection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.detection_line())?;
        write!(f, "{}", self.record.diagnosis())
    }
}

/// Diagnostics for every detection in one image.
#[derive(Debug, Clone)]
pub struct ImageReport<'t> {
    pub image: String,
    pub diagnoses: Vec<DiagnosedDetection<'t>>,
}

impl fmt::Display for ImageReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Imagen: {}", self.image)?;
        if self.diagnoses.is_empty() {
            return write!(f, "Sin detecciones.");
        }
        for (idx, diagnosis) in self.diagnoses.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{diagnosis}")?;
        }
        Ok(())
    }
}

/// Summary line printed for each detection.
pub fn detection_line(record: &ClassRecord, confidence: f32) -> String {
    format!("Detectado: {} (Confianza: {confidence:.2})", record.name)
}

/// Bind every detection to its class record.
///
/// An unmapped class index fails the whole report; it means the model and the table
/// disagree about the class space.
pub fn diagnose_results<'t>(
    table: &'t ClassTable,
    results: &[DetectionResult],
) -> Result<Vec<ImageReport<'t>>, ClassError> {
    results
        .iter()
        .map(|result| {
            let diagnoses = result
                .detections
                .iter()
                .map(|detection| {
                    Ok(DiagnosedDetection {
                        detection: detection.clone(),
                        record: table.describe(detection.class_index)?,
                    })
                })
                .collect::<Result<Vec<_>, ClassError>>()?;
            Ok(ImageReport {
                image: result.image.clone(),
                diagnoses,
            })
        })
        .collect()
}
