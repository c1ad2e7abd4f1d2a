//! Google Cloud Vision text detection client
//!
//! Sends one `images:annotate` request with the `TEXT_DETECTION` feature and
//! converts the annotations into an [`OcrResult`]. The first annotation is
//! the full text; the rest are individual words.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::auth::TokenProvider;
use super::{OcrError, OcrResult, OcrToken, Point, Polygon, TextDetector};
use crate::config::OcrSettings;

/// Default REST endpoint for Cloud Vision
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1";

/// Cloud Vision OCR client with a blocking API
pub struct CloudVisionClient {
    http: reqwest::Client,
    runtime: Runtime,
    endpoint: String,
    auth: TokenProvider,
}

impl CloudVisionClient {
    /// Create a client from OCR settings
    pub fn new(settings: &OcrSettings) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(OcrError::Runtime)?;

        let auth = TokenProvider::from_settings(settings)?;
        info!("Cloud Vision client using {} credentials", auth.describe());

        Ok(Self {
            http,
            runtime,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            auth,
        })
    }

    async fn annotate(&self, image_bytes: &[u8]) -> Result<OcrResult, OcrError> {
        let body = serde_json::json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image_bytes) },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let url = format!("{}/images:annotate", self.endpoint);
        let request = self.auth.authorize(&self.http, self.http.post(&url)).await?;
        let response = request.json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(OcrError::Status {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        parse_annotate_response(&text)
    }
}

impl TextDetector for CloudVisionClient {
    fn detect_text(&self, image_bytes: &[u8]) -> Result<OcrResult, OcrError> {
        info!("Running Cloud Vision text detection on {} bytes", image_bytes.len());
        let result = self.runtime.block_on(self.annotate(image_bytes))?;
        debug!("Cloud Vision returned {} tokens", result.tokens.len());
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

/// Vision omits zero coordinates from vertices
#[derive(Debug, Deserialize)]
struct Vertex {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiStatus,
}

/// Convert an `images:annotate` response body into an [`OcrResult`]
pub fn parse_annotate_response(body: &str) -> Result<OcrResult, OcrError> {
    let parsed: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

    let Some(response) = parsed.responses.into_iter().next() else {
        return Ok(OcrResult::empty());
    };

    if let Some(error) = response.error {
        if !error.message.is_empty() {
            return Err(OcrError::Service(error.message));
        }
    }

    let mut annotations = response.text_annotations.into_iter();
    let Some(full) = annotations.next() else {
        return Ok(OcrResult::empty());
    };

    let tokens = annotations
        .map(|annotation| {
            let vertices = annotation
                .bounding_poly
                .map(|poly| {
                    poly.vertices
                        .into_iter()
                        .map(|v| Point::new(v.x, v.y))
                        .collect()
                })
                .unwrap_or_default();
            OcrToken::new(annotation.description, Polygon::new(vertices))
        })
        .collect();

    Ok(OcrResult {
        text: full.description,
        tokens,
    })
}

/// Pull `error.message` out of a Google API error body, or fall back to the raw body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEIPT_RESPONSE: &str = r#"{
        "responses": [{
            "textAnnotations": [
                {
                    "locale": "en",
                    "description": "STARBUCKS\nTOTAL 42.50",
                    "boundingPoly": { "vertices": [{"x": 3, "y": 2}, {"x": 210, "y": 2}, {"x": 210, "y": 90}, {"x": 3, "y": 90}] }
                },
                {
                    "description": "STARBUCKS",
                    "boundingPoly": { "vertices": [{"x": 10, "y": 4}, {"x": 120, "y": 4}, {"x": 120, "y": 30}, {"x": 10, "y": 30}] }
                },
                {
                    "description": "TOTAL",
                    "boundingPoly": { "vertices": [{"y": 60}, {"x": 60, "y": 60}, {"x": 60, "y": 85}, {"y": 85}] }
                },
                {
                    "description": "42.50",
                    "boundingPoly": { "vertices": [{"x": 140, "y": 61}, {"x": 205, "y": 59}, {"x": 206, "y": 84}, {"x": 141, "y": 86}] }
                }
            ]
        }]
    }"#;

    #[test]
    fn test_parse_tokens_in_detection_order() {
        let result = parse_annotate_response(RECEIPT_RESPONSE).unwrap();

        assert_eq!(result.text, "STARBUCKS\nTOTAL 42.50");
        let texts: Vec<&str> = result.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["STARBUCKS", "TOTAL", "42.50"]);
        assert_eq!(result.tokens[2].polygon.vertices()[1], Point::new(205, 59));
    }

    #[test]
    fn test_missing_coordinates_default_to_zero() {
        let result = parse_annotate_response(RECEIPT_RESPONSE).unwrap();
        assert_eq!(result.tokens[1].polygon.vertices()[0], Point::new(0, 60));
    }

    #[test]
    fn test_no_text_is_empty_result() {
        let result = parse_annotate_response(r#"{"responses": [{}]}"#).unwrap();
        assert!(result.is_empty());
        assert!(result.text.is_empty());

        let result = parse_annotate_response(r#"{"responses": []}"#).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_service_error_is_surfaced() {
        let body = r#"{"responses": [{"error": {"code": 7, "message": "Cloud Vision API has not been used in project 123"}}]}"#;
        let err = parse_annotate_response(body).unwrap_err();
        match err {
            OcrError::Service(message) => assert!(message.contains("has not been used")),
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_body_is_invalid_response() {
        let err = parse_annotate_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, OcrError::InvalidResponse(_)));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(api_error_message(body), "API key not valid");
        assert_eq!(api_error_message("upstream timeout\n"), "upstream timeout");
    }
}
