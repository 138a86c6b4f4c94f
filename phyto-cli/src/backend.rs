//! `predict` subcommand: one request against the prediction backend, reported verbosely.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result, bail};
use phyto_core::{
    PredictClient, PredictDetection, PredictError, PredictOptions, PredictOutcome, PredictReply,
};
use phyto_utils::{BackendSettings, normalize_path};

const NOT_AVAILABLE: &str = "N/A";

pub fn run_predict(backend: &BackendSettings, image: &Path) -> Result<()> {
    let image = normalize_path(image)?;
    let client = PredictClient::new(&backend.url, Duration::from_secs(backend.timeout_secs))?;
    let options = PredictOptions {
        predict_dir: backend.predict_dir.clone(),
        upload_dir: backend.upload_dir.clone(),
    };

    match client.predict(&image, &options) {
        Ok(reply) => report_reply(&reply),
        Err(err) => {
            report_failure(&err);
            Err(err).with_context(|| format!("prediction for {} failed", image.display()))
        }
    }
}

fn report_reply(reply: &PredictReply) -> Result<()> {
    print_exchange(Some(reply.status), &reply.headers, &reply.body_prefix);

    match &reply.outcome {
        PredictOutcome::Rejected { raw } => {
            println!("\nEl backend respondió pero no fue exitoso.");
            println!("{raw}");
            bail!("backend answered with success=false");
        }
        PredictOutcome::Success(response) => {
            println!("\nComunicación exitosa y predicción realizada.");
            if let Some(first) = response.detections.first() {
                println!(
                    "Enfermedad detectada: {}",
                    first.class_name_en.as_deref().unwrap_or(NOT_AVAILABLE)
                );
                println!("Precisión (confidence): {}", confidence_text(first));
                println!("Bounding box: {}", bbox_text(first));
            } else {
                println!("Sin detecciones.");
            }

            println!("\n--- Detecciones detalladas ---");
            for (idx, det) in response.detections.iter().enumerate() {
                println!("Detección #{}:", idx + 1);
                println!(
                    "  class_name_en: {}",
                    det.class_name_en.as_deref().unwrap_or(NOT_AVAILABLE)
                );
                println!(
                    "  class_name_es: {}",
                    det.class_name_es.as_deref().unwrap_or(NOT_AVAILABLE)
                );
                match det.id {
                    Some(id) => println!("  id: {id}"),
                    None => println!("  id: {NOT_AVAILABLE}"),
                }
                println!("  confianza: {}", confidence_text(det));
                println!("  bbox: {}", bbox_text(det));
            }

            if let Some(path) = reply.annotated_path.as_ref() {
                println!("\nImagen de salida guardada como {}", path.display());
            }
            Ok(())
        }
    }
}

fn report_failure(err: &PredictError) {
    match err {
        PredictError::Network { .. } | PredictError::Timeout { .. } => {
            println!("\nError al conectar con el backend: {err}");
        }
        PredictError::Http {
            status,
            headers,
            body_prefix,
        } => {
            print_exchange(Some(*status), headers, body_prefix);
            println!("\nEl backend respondió con un error HTTP ({status}).");
        }
        PredictError::Decode {
            message,
            body_prefix,
        } => {
            if !body_prefix.is_empty() {
                print_exchange(None, &[], body_prefix);
            }
            println!("\nError al interpretar la respuesta: {message}");
        }
        PredictError::Io { .. } => {
            println!("\nError de archivo local: {err}");
        }
    }
    println!("[{}]", err.category());
}

fn print_exchange(status: Option<u16>, headers: &[(String, String)], body_prefix: &str) {
    if let Some(status) = status {
        println!("Status code: {status}");
    }
    println!("\n--- Detalles de la respuesta ---");
    if !headers.is_empty() {
        println!("Headers:");
        for (name, value) in headers {
            println!("  {name}: {value}");
        }
    }
    println!("\nTexto bruto de la respuesta:");
    println!("{body_prefix}");
}

fn confidence_text(det: &PredictDetection) -> String {
    det.confidence_percent()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn bbox_text(det: &PredictDetection) -> String {
    let [x1, y1, x2, y2] = det.bbox;
    format!("[{x1}, {y1}, {x2}, {y2}]")
}
