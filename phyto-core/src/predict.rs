//! Blocking client for the prediction backend's `/predict` endpoint.
//!
//! The client uploads one JPEG as multipart field `image`, waits up to the configured
//! timeout, and classifies the reply: transport failures ([`PredictError::Network`],
//! [`PredictError::Timeout`]), non-2xx answers ([`PredictError::Http`]), and bodies that
//! are not the expected JSON ([`PredictError::Decode`]) are all distinct.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::{debug, info};
use phyto_utils::{derived_output_path, timing_guard};
use reqwest::blocking::{
    Client,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PredictError;

/// Number of response characters kept for diagnostics.
pub const BODY_PREFIX_LIMIT: usize = 500;

/// Suffix appended to the input stem for the annotated image.
pub const ANNOTATED_SUFFIX: &str = "_box";

/// One detection as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictDetection {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub class_name_en: Option<String>,
    #[serde(default)]
    pub class_name_es: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub bbox: [f64; 4],
}

impl PredictDetection {
    /// Confidence as a percentage with two decimals, e.g. `93.40%`.
    pub fn confidence_percent(&self) -> Option<String> {
        self.confidence.map(|c| format!("{:.2}%", c * 100.0))
    }
}

/// Successful `/predict` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub detections: Vec<PredictDetection>,
    /// Base64-encoded JPEG with the boxes drawn in.
    #[serde(default)]
    pub image_with_boxes: Option<String>,
}

/// A backend reply that parsed cleanly.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutcome {
    /// `success: true` with a well-formed detection list.
    Success(PredictResponse),
    /// The backend answered with `success: false`.
    Rejected { raw: Value },
}

/// Everything observed for one request.
#[derive(Debug, Clone)]
pub struct PredictReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body_prefix: String,
    pub outcome: PredictOutcome,
    /// Where the annotated image was written, when one was returned.
    pub annotated_path: Option<PathBuf>,
}

/// Local directories used around a request.
#[derive(Debug, Clone)]
pub struct PredictOptions {
    /// Receives `<input stem>_box.jpg`.
    pub predict_dir: PathBuf,
    /// Receives a copy of the uploaded image when set.
    pub upload_dir: Option<PathBuf>,
}

/// Blocking HTTP client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct PredictClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl PredictClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PredictError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("phytoguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| PredictError::Network {
                url: endpoint.clone(),
                source,
            })?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upload `image_path` and interpret the reply.
    pub fn predict(
        &self,
        image_path: &Path,
        options: &PredictOptions,
    ) -> Result<PredictReply, PredictError> {
        let _guard = timing_guard("phyto_core::predict", log::Level::Debug);
        let bytes = fs::read(image_path).map_err(|source| PredictError::Io {
            action: "read",
            path: image_path.to_path_buf(),
            source,
        })?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());

        if let Some(upload_dir) = options.upload_dir.as_ref() {
            let target = upload_dir.join(&file_name);
            write_file(&target, &bytes)?;
            debug!("Archived upload as {}", target.display());
        }

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|source| self.transport_error(source))?;
        let form = Form::new().part("image", part);

        info!("POST {} ({})", self.endpoint, image_path.display());
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|source| self.transport_error(source))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .map_err(|source| self.transport_error(source))?;
        let body_prefix = body_prefix(&body);
        info!("Status code: {status}");
        debug!("Raw response: {body_prefix}");

        let outcome = interpret_response(status, &body).map_err(|err| match err {
            PredictError::Http {
                status,
                body_prefix,
                ..
            } => PredictError::Http {
                status,
                headers: headers.clone(),
                body_prefix,
            },
            other => other,
        })?;
        let annotated_path = match &outcome {
            PredictOutcome::Success(response) => {
                save_annotated_image(response, image_path, &options.predict_dir)?
            }
            PredictOutcome::Rejected { .. } => None,
        };

        Ok(PredictReply {
            status,
            headers,
            body_prefix,
            outcome,
            annotated_path,
        })
    }

    fn transport_error(&self, source: reqwest::Error) -> PredictError {
        if source.is_timeout() {
            PredictError::Timeout {
                url: self.endpoint.clone(),
                timeout: self.timeout,
            }
        } else {
            PredictError::Network {
                url: self.endpoint.clone(),
                source,
            }
        }
    }
}

/// First [`BODY_PREFIX_LIMIT`] characters of `body`, with `...` when truncated.
pub fn body_prefix(body: &str) -> String {
    let mut chars = body.char_indices();
    match chars.nth(BODY_PREFIX_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Classify a backend reply from its status code and body.
pub fn interpret_response(status: u16, body: &str) -> Result<PredictOutcome, PredictError> {
    if !(200..300).contains(&status) {
        return Err(PredictError::Http {
            status,
            headers: Vec::new(),
            body_prefix: body_prefix(body),
        });
    }

    let decode_error = |message: String| PredictError::Decode {
        message,
        body_prefix: body_prefix(body),
    };

    let raw: Value =
        serde_json::from_str(body).map_err(|err| decode_error(format!("invalid JSON: {err}")))?;
    let success = raw
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| decode_error("missing boolean `success` field".to_string()))?;
    if !success {
        return Ok(PredictOutcome::Rejected { raw });
    }

    let response: PredictResponse = serde_json::from_value(raw)
        .map_err(|err| decode_error(format!("unexpected payload shape: {err}")))?;
    Ok(PredictOutcome::Success(response))
}

/// Decode and persist the annotated image when the reply carries detections and an image.
///
/// Returns `None` without decoding anything when there are no detections or no image.
pub fn save_annotated_image(
    response: &PredictResponse,
    input_path: &Path,
    predict_dir: &Path,
) -> Result<Option<PathBuf>, PredictError> {
    if response.detections.is_empty() {
        return Ok(None);
    }
    let Some(encoded) = response.image_with_boxes.as_deref() else {
        return Ok(None);
    };

    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|err| PredictError::Decode {
            message: format!("`image_with_boxes` is not valid base64: {err}"),
            body_prefix: String::new(),
        })?;
    let decoded = image::load_from_memory(&bytes).map_err(|err| PredictError::Decode {
        message: format!("`image_with_boxes` is not a readable image: {err}"),
        body_prefix: String::new(),
    })?;

    let target = derived_output_path(predict_dir, input_path, ANNOTATED_SUFFIX, "jpg");
    write_file(&target, &bytes)?;
    info!(
        "Annotated image ({}x{}) saved to {}",
        decoded.width(),
        decoded.height(),
        target.display()
    );
    Ok(Some(target))
}

fn write_file(target: &Path, bytes: &[u8]) -> Result<(), PredictError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PredictError::Io {
            action: "create",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(target, bytes).map_err(|source| PredictError::Io {
        action: "write",
        path: target.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_detections_report_success() {
        let outcome = interpret_response(200, r#"{"success": true, "detections": []}"#).unwrap();
        match outcome {
            PredictOutcome::Success(response) => {
                assert!(response.detections.is_empty());
                assert!(response.image_with_boxes.is_none());
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn non_success_status_is_an_http_error_even_for_plain_text() {
        let err = interpret_response(500, "Internal Server Error").unwrap_err();
        match err {
            PredictError::Http {
                status,
                headers,
                body_prefix,
            } => {
                assert!(headers.is_empty());
                assert_eq!(status, 500);
                assert_eq!(body_prefix, "Internal Server Error");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_with_ok_status_is_a_decode_error() {
        let err = interpret_response(200, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, PredictError::Decode { .. }));
        assert_eq!(err.category(), "undecodable");
    }

    #[test]
    fn success_false_is_rejected() {
        let outcome = interpret_response(200, r#"{"success": false, "error": "bad image"}"#).unwrap();
        match outcome {
            PredictOutcome::Rejected { raw } => assert_eq!(raw["error"], "bad image"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_decode_errors() {
        assert!(matches!(
            interpret_response(200, r#"{"detections": []}"#),
            Err(PredictError::Decode { .. })
        ));
        assert!(matches!(
            interpret_response(200, r#"{"success": true}"#),
            Err(PredictError::Decode { .. })
        ));
        assert!(matches!(
            interpret_response(200, r#"{"success": true, "detections": [{"id": 1}]}"#),
            Err(PredictError::Decode { .. })
        ));
    }

    #[test]
    fn detection_fields_besides_bbox_are_optional() {
        let body = r#"{"success": true, "detections": [
            {"id": 3, "class_name_en": "Apple___healthy", "class_name_es": "Manzano sano",
             "confidence": 0.934, "bbox": [1, 2, 3, 4]},
            {"bbox": [0, 0, 1, 1]}
        ]}"#;
        let PredictOutcome::Success(response) = interpret_response(200, body).unwrap() else {
            panic!("expected success");
        };
        assert_eq!(response.detections[0].confidence_percent().as_deref(), Some("93.40%"));
        assert_eq!(response.detections[1].confidence_percent(), None);
        assert_eq!(response.detections[1].bbox, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn body_prefix_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREFIX_LIMIT + 10);
        let prefix = body_prefix(&long);
        assert!(prefix.ends_with("..."));
        assert_eq!(prefix.chars().count(), BODY_PREFIX_LIMIT + 3);
        assert_eq!(body_prefix("short"), "short");
    }

    #[test]
    fn no_image_is_written_without_detections() {
        let response = PredictResponse {
            success: true,
            detections: Vec::new(),
            image_with_boxes: Some("not even base64".into()),
        };
        let saved =
            save_annotated_image(&response, Path::new("leaf.jpg"), Path::new("/nonexistent"))
                .unwrap();
        assert!(saved.is_none());
    }
}
