mod common;

use std::{error::Error, fs};

use common::{phytoguard, stdout_of};
use phyto_utils::fixture_path;
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn describe_last_class_prints_diagnostic_block() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let output = phytoguard(work_dir.path()).args(["describe", "37"]).output()?;
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout_of(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "--- Diagnóstico ---");
    assert_eq!(lines[1], "Clase detectada: Tomate sano");
    assert!(lines[2].starts_with("Descripción: "));
    assert!(lines[3].starts_with("Recomendación: "));
    Ok(())
}

#[test]
fn describe_rejects_out_of_range_indices() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    for index in ["38", "-1"] {
        let output = phytoguard(work_dir.path()).args(["describe", index]).output()?;
        assert!(!output.status.success(), "index {index} should fail");
        assert!(stdout_of(&output).is_empty());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("out of range"), "{stderr}");
    }
    Ok(())
}

#[test]
fn classes_validate_against_fixture_names() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let names = fixture_path("classes.yaml")?;
    let output = phytoguard(work_dir.path())
        .arg("classes")
        .arg("--validate")
        .arg(&names)
        .output()?;
    assert!(output.status.success(), "{output:?}");
    assert!(stdout_of(&output).contains("38 classes"));

    let short = work_dir.path().join("short.yaml");
    fs::write(&short, "names:\n  - Apple___Apple_scab\n")?;
    let output = phytoguard(work_dir.path())
        .arg("classes")
        .arg("--validate")
        .arg(&short)
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn custom_class_table_replaces_builtin() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let table = work_dir.path().join("table.json");
    fs::write(
        &table,
        r#"{"version": "test/1", "locale": "en", "classes": [
            {"key": "Leaf___healthy", "name": "Healthy leaf",
             "description": "No lesions.", "recommendation": "Nothing to do."}
        ]}"#,
    )?;

    let output = phytoguard(work_dir.path())
        .arg("--classes")
        .arg(&table)
        .args(["describe", "0"])
        .output()?;
    assert!(output.status.success(), "{output:?}");
    assert!(stdout_of(&output).contains("Clase detectada: Healthy leaf"));

    let output = phytoguard(work_dir.path())
        .arg("--classes")
        .arg(&table)
        .args(["describe", "1"])
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn report_prints_diagnoses_for_fixture_detections() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let detections = fixture_path("detections/sample.json")?;
    let output = phytoguard(work_dir.path())
        .arg("report")
        .arg(&detections)
        .output()?;
    assert!(output.status.success(), "{output:?}");

    let stdout = stdout_of(&output);
    assert!(stdout.contains("Imagen: leaves/apple_scab_01.jpg"));
    assert!(stdout.contains("Detectado: Sarna del manzano (Confianza: 0.93)"));
    assert_eq!(stdout.matches("--- Diagnóstico ---").count(), 3);
    assert!(stdout.contains("Sin detecciones."));
    Ok(())
}

#[test]
fn report_json_binds_class_keys() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let detections = fixture_path("detections/sample.json")?;
    let out = work_dir.path().join("report.json");
    let output = phytoguard(work_dir.path())
        .arg("report")
        .arg(&detections)
        .arg("--json")
        .arg(&out)
        .output()?;
    assert!(output.status.success(), "{output:?}");

    let report: Value = serde_json::from_slice(&fs::read(&out)?)?;
    assert_eq!(report.as_array().map(Vec::len), Some(3));
    assert_eq!(report[1]["detections"][0]["key"], "Potato___Late_blight");
    assert_eq!(report[1]["detections"][0]["class_index"], 21);
    Ok(())
}

#[test]
fn report_with_unmapped_class_fails() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let detections = fixture_path("detections/unmapped.json")?;
    let output = phytoguard(work_dir.path())
        .arg("report")
        .arg(&detections)
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn summary_reports_best_epoch() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let results = fixture_path("runs/results.csv")?;
    let output = phytoguard(work_dir.path())
        .arg("summary")
        .arg(&results)
        .output()?;
    assert!(output.status.success(), "{output:?}");
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Épocas: 4"), "{stdout}");
    assert!(stdout.contains("Mejor época 3"), "{stdout}");
    Ok(())
}

#[test]
fn eval_writes_normalized_matrix() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let confusion = fixture_path("metrics/confusion.json")?;
    let out = work_dir.path().join("eval.json");
    let output = phytoguard(work_dir.path())
        .arg("eval")
        .arg(&confusion)
        .arg("--json")
        .arg(&out)
        .output()?;
    assert!(output.status.success(), "{output:?}");

    let eval: Value = serde_json::from_slice(&fs::read(&out)?)?;
    assert_eq!(eval["normalized"][0][0], 0.9);
    assert_eq!(eval["normalized"][1][0], 0.1);
    assert_eq!(eval["normalized"][2], serde_json::json!([0.0, 0.0, 0.0]));
    assert_eq!(eval["classes"][1]["recall"], 0.9);
    Ok(())
}
