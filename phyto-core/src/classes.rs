//! Class metadata binding.
//!
//! A [`ClassTable`] maps the detection model's zero-based class index to a localized
//! [`ClassRecord`]. Tables are versioned JSON resources; a Spanish PlantVillage table is
//! embedded as the default. Each record also carries the model's class name as a stable
//! key so the table can be checked against the class list of a trained model.

use std::{collections::HashSet, fmt, fs, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ClassError;

const BUILTIN_TABLE: &str = include_str!("../assets/class_metadata.json");

/// Localized metadata for one disease or health category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Class name used by the detection model.
    pub key: String,
    /// Display name in the table's locale.
    pub name: String,
    pub description: String,
    pub recommendation: String,
}

impl ClassRecord {
    /// The labeled diagnostic block for this class.
    pub fn diagnosis(&self) -> Diagnosis<'_> {
        Diagnosis { record: self }
    }
}

/// Human-readable diagnostic block.
///
/// Renders as a header followed by three labeled lines:
///
/// ```text
/// --- Diagnóstico ---
/// Clase detectada: <name>
/// Descripción: <description>
/// Recomendación: <recommendation>
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Diagnosis<'a> {
    record: &'a ClassRecord,
}

impl Diagnosis<'_> {
    pub const HEADER: &'static str = "--- Diagnóstico ---";
    pub const CLASS_LABEL: &'static str = "Clase detectada";
    pub const DESCRIPTION_LABEL: &'static str = "Descripción";
    pub const RECOMMENDATION_LABEL: &'static str = "Recomendación";
}

impl fmt::Display for Diagnosis<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", Self::HEADER)?;
        writeln!(f, "{}: {}", Self::CLASS_LABEL, self.record.name)?;
        writeln!(f, "{}: {}", Self::DESCRIPTION_LABEL, self.record.description)?;
        write!(
            f,
            "{}: {}",
            Self::RECOMMENDATION_LABEL,
            self.record.recommendation
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TableFile {
    version: String,
    #[serde(default)]
    locale: Option<String>,
    classes: Vec<ClassRecord>,
}

/// Ordered, read-only class metadata indexed by the model's class index.
#[derive(Debug, Clone)]
pub struct ClassTable {
    version: String,
    locale: Option<String>,
    records: Vec<ClassRecord>,
}

impl ClassTable {
    /// The table embedded in the crate (38 PlantVillage classes, Spanish).
    pub fn builtin() -> Result<Self, ClassError> {
        Self::from_json_str(BUILTIN_TABLE, "built-in class table")
    }

    /// Load a table from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ClassError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents, &path.display().to_string())
    }

    /// Parse a table from JSON text. `origin` names the source in error messages.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, ClassError> {
        let file: TableFile = serde_json::from_str(json).map_err(|err| ClassError::Parse {
            origin: origin.to_string(),
            message: err.to_string(),
        })?;
        Self::from_records(file.version, file.locale, file.classes).map_err(|err| match err {
            ClassError::Mismatch(message) => ClassError::Parse {
                origin: origin.to_string(),
                message,
            },
            other => other,
        })
    }

    /// Build a table from records; keys must be non-empty and unique.
    pub fn from_records(
        version: impl Into<String>,
        locale: Option<String>,
        records: Vec<ClassRecord>,
    ) -> Result<Self, ClassError> {
        if records.is_empty() {
            return Err(ClassError::Mismatch("table has no classes".to_string()));
        }
        let mut seen = HashSet::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if record.key.trim().is_empty() {
                return Err(ClassError::Mismatch(format!("class {idx} has an empty key")));
            }
            if !seen.insert(record.key.as_str()) {
                return Err(ClassError::Mismatch(format!(
                    "class key '{}' appears more than once",
                    record.key
                )));
            }
        }
        let table = Self {
            version: version.into(),
            locale,
            records,
        };
        debug!(
            "Loaded class table {} with {} classes",
            table.version,
            table.len()
        );
        Ok(table)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    /// Look up the record for a model class index.
    pub fn describe(&self, class_index: i64) -> Result<&ClassRecord, ClassError> {
        usize::try_from(class_index)
            .ok()
            .and_then(|idx| self.records.get(idx))
            .ok_or(ClassError::IndexOutOfRange {
                index: class_index,
                len: self.records.len(),
            })
    }

    /// Look up a record by its stable key.
    pub fn find_by_key(&self, key: &str) -> Option<(usize, &ClassRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, record)| record.key == key)
    }

    /// Check that the table lines up with the model's class list, index for index.
    pub fn validate_against<S: AsRef<str>>(&self, model_classes: &[S]) -> Result<(), ClassError> {
        if model_classes.len() != self.records.len() {
            return Err(ClassError::Mismatch(format!(
                "model reports {} classes but table {} has {}",
                model_classes.len(),
                self.version,
                self.records.len()
            )));
        }
        for (idx, (expected, record)) in model_classes.iter().zip(&self.records).enumerate() {
            if expected.as_ref() != record.key {
                return Err(ClassError::Mismatch(format!(
                    "index {idx}: model class '{}' but table entry '{}'",
                    expected.as_ref(),
                    record.key
                )));
            }
        }
        Ok(())
    }

    /// Serialize the table in the same JSON layout it is loaded from.
    pub fn to_json_string(&self) -> Result<String, ClassError> {
        let file = TableFile {
            version: self.version.clone(),
            locale: self.locale.clone(),
            classes: self.records.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|err| ClassError::Parse {
            origin: self.version.clone(),
            message: err.to_string(),
        })
    }
}
