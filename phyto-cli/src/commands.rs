//! Handlers for the dataset, class table, and report subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use phyto_core::{
    BoundingBox, ClassTable, ConfusionMatrix, DatasetDescriptor, PartitionRequest, Split,
    TrainingHistory, diagnose_results, export_best_checkpoint, load_class_names,
    load_detection_results, partition_dataset,
};
use phyto_utils::{AppSettings, write_bytes};
use serde::Serialize;

/// Resolve the class table from settings, falling back to the built-in one.
pub fn load_class_table(settings: &AppSettings) -> Result<ClassTable> {
    match settings.paths.class_table.as_ref() {
        Some(path) => {
            let table = ClassTable::load(path)
                .with_context(|| format!("failed to load class table {}", path.display()))?;
            info!(
                "Using class table {} ({} classes) from {}",
                table.version(),
                table.len(),
                path.display()
            );
            Ok(table)
        }
        None => ClassTable::builtin().context("built-in class table is invalid"),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = serde_json::to_vec_pretty(value).context("failed to serialize JSON output")?;
    write_bytes(path, &payload)?;
    info!("Wrote {}", path.display());
    Ok(())
}

pub fn run_split(settings: &AppSettings, json: Option<&Path>) -> Result<()> {
    let paths = &settings.paths;
    let image_root = paths
        .image_root
        .clone()
        .context("no image directory configured; pass --images or set paths.image_root")?;
    let label_root = paths
        .label_root
        .clone()
        .context("no label directory configured; pass --labels or set paths.label_root")?;

    let request = PartitionRequest {
        image_root,
        label_root,
        destination_root: paths.dataset_root.clone(),
        pairing: settings.split.pairing,
        seed: settings.split.seed,
        max_pairs: settings.split.max_pairs,
        train_ratio: settings.split.train_ratio,
        valid_ratio: settings.split.valid_ratio,
    };
    let report = partition_dataset(&request).with_context(|| {
        format!(
            "failed to partition {} into {}",
            request.image_root.display(),
            request.destination_root.display()
        )
    })?;

    println!("Number of paired paths: {}", report.kept);
    for split in Split::ALL {
        println!(
            "{}: {}",
            request.destination_root.join(split.dir_name()).display(),
            report.counts.get(split)
        );
    }
    if let Some(path) = json {
        write_json(path, &report)?;
    }
    Ok(())
}

pub fn run_dataset_config(settings: &AppSettings) -> Result<()> {
    let paths = &settings.paths;
    let names = load_class_names(&paths.class_names)?;
    if let Some(table_path) = paths.class_table.as_ref() {
        let table = load_class_table(settings)?;
        table
            .validate_against(&names)
            .with_context(|| format!("class table {} disagrees", table_path.display()))?;
    }
    let descriptor = DatasetDescriptor::for_split_root(&paths.dataset_root, names);
    descriptor.save(&paths.dataset_config)?;
    println!(
        "{} ({} classes)",
        paths.dataset_config.display(),
        descriptor.nc
    );
    Ok(())
}

pub fn run_describe(table: &ClassTable, index: i64) -> Result<()> {
    let record = table.describe(index)?;
    println!("{}", record.diagnosis());
    Ok(())
}

pub fn run_classes(table: &ClassTable, validate: Option<&Path>, json: bool) -> Result<()> {
    if let Some(names_path) = validate {
        let names = load_class_names(names_path)?;
        table.validate_against(&names).with_context(|| {
            format!(
                "class table {} does not match {}",
                table.version(),
                names_path.display()
            )
        })?;
        println!(
            "Class table {} matches {} ({} classes)",
            table.version(),
            names_path.display(),
            names.len()
        );
        return Ok(());
    }

    if json {
        println!("{}", table.to_json_string()?);
        return Ok(());
    }

    println!(
        "Class table {} [{}]: {} classes",
        table.version(),
        table.locale().unwrap_or("-"),
        table.len()
    );
    for (idx, record) in table.records().iter().enumerate() {
        println!("{idx:>3}  {:<50}  {}", record.key, record.name);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    class_index: i64,
    key: &'a str,
    name: &'a str,
    confidence: f32,
    bbox: BoundingBox,
    description: &'a str,
    recommendation: &'a str,
}

#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    image: &'a str,
    detections: Vec<ReportEntry<'a>>,
}

pub fn run_report(table: &ClassTable, detections: &Path, json: Option<&Path>) -> Result<()> {
    let results = load_detection_results(detections)?;
    let reports = diagnose_results(table, &results)
        .with_context(|| format!("failed to diagnose {}", detections.display()))?;
    let total: usize = reports.iter().map(|r| r.diagnoses.len()).sum();
    info!("{} image(s), {total} detection(s)", reports.len());

    if let Some(path) = json {
        let records: Vec<ReportRecord<'_>> = reports
            .iter()
            .map(|report| ReportRecord {
                image: &report.image,
                detections: report
                    .diagnoses
                    .iter()
                    .map(|d| ReportEntry {
                        class_index: d.detection.class_index,
                        key: &d.record.key,
                        name: &d.record.name,
                        confidence: d.detection.confidence,
                        bbox: d.detection.bbox,
                        description: &d.record.description,
                        recommendation: &d.record.recommendation,
                    })
                    .collect(),
            })
            .collect();
        return write_json(path, &records);
    }

    for report in &reports {
        println!("{report}");
    }
    Ok(())
}

pub fn run_export(settings: &AppSettings) -> Result<()> {
    let paths = &settings.paths;
    let bytes = export_best_checkpoint(&paths.run_dir, &paths.checkpoint).with_context(|| {
        format!(
            "failed to export checkpoint from {}",
            paths.run_dir.display()
        )
    })?;
    println!("{} ({bytes} bytes)", paths.checkpoint.display());
    Ok(())
}

pub fn run_summary(settings: &AppSettings, results: Option<&Path>) -> Result<()> {
    let default_path = settings.paths.run_dir.join("results.csv");
    let path = results.unwrap_or(&default_path);
    let history = TrainingHistory::load(path)?;
    if history.epochs.is_empty() {
        warn!("{} contains no epochs", path.display());
    }
    println!("{history}");
    Ok(())
}

#[derive(Debug, Serialize)]
struct EvalOutput<'a> {
    accuracy: f64,
    names: &'a [String],
    normalized: Vec<Vec<f64>>,
    classes: Vec<phyto_core::ClassMetrics>,
}

pub fn run_eval(confusion: &Path, json: Option<&Path>) -> Result<()> {
    let matrix = ConfusionMatrix::load(confusion)?;
    let output = EvalOutput {
        accuracy: matrix.accuracy(),
        names: &matrix.names,
        normalized: matrix.normalized(),
        classes: matrix.per_class(),
    };
    if let Some(path) = json {
        return write_json(path, &output);
    }

    println!("Exactitud global: {:.4}", output.accuracy);
    println!("{:<40} {:>9} {:>9} {:>8}", "Clase", "Precisión", "Recall", "Soporte");
    for class in &output.classes {
        println!(
            "{:<40} {:>9.4} {:>9.4} {:>8}",
            class.name, class.precision, class.recall, class.support
        );
    }
    Ok(())
}
