//! Vision/OCR Layer
//!
//! Word-level text detection on document images. The detector returns
//! tokens in the order the OCR engine produced them, each with the polygon
//! the engine reported. Backends:
//! - Google Cloud Vision `TEXT_DETECTION` (REST)

pub mod auth;
pub mod cloud_vision;

pub use cloud_vision::CloudVisionClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single polygon vertex in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Ordered polygon vertices as returned by the OCR engine.
///
/// Usually four points, not necessarily axis-aligned. No closing vertex is
/// stored; consumers close the last vertex back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(pub Vec<Point>);

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self(vertices)
    }

    /// Build a polygon from `(x, y)` pairs
    #[cfg(test)]
    pub fn from_pairs(pairs: &[(i32, i32)]) -> Self {
        Self(pairs.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    pub fn vertices(&self) -> &[Point] {
        &self.0
    }

    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.0.first()?;
        Some(self.0.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }
}

/// One detected word with its polygon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrToken {
    /// Literal text as detected
    pub text: String,
    /// Bounding polygon
    pub polygon: Polygon,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, polygon: Polygon) -> Self {
        Self {
            text: text.into(),
            polygon,
        }
    }
}

/// Result of one OCR pass over a document image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Full concatenated text
    pub text: String,
    /// Tokens in detection order (not spatial order)
    pub tokens: Vec<OcrToken>,
}

impl OcrResult {
    /// No text detected
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// OCR failures. Zero detected text is not an error.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The service answered with its own error message
    #[error("OCR service error: {0}")]
    Service(String),

    #[error("OCR request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected OCR response: {0}")]
    InvalidResponse(String),

    #[error("Failed to start OCR runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Anything that turns encoded image bytes into word-level tokens
pub trait TextDetector {
    fn detect_text(&self, image_bytes: &[u8]) -> Result<OcrResult, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_bounds() {
        let poly = Polygon::from_pairs(&[(10, 5), (40, 8), (38, 20), (9, 18)]);
        assert_eq!(poly.bounds(), Some((9, 5, 40, 20)));
        assert_eq!(poly.vertices().len(), 4);
    }

    #[test]
    fn test_empty_polygon_has_no_bounds() {
        assert_eq!(Polygon::default().bounds(), None);
    }

    #[test]
    fn test_ocr_result_json_shape() {
        let result = OcrResult {
            text: "TOTAL 42.50".to_string(),
            tokens: vec![OcrToken::new("TOTAL", Polygon::from_pairs(&[(0, 0), (5, 0)]))],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tokens"][0]["polygon"][1]["x"], 5);
        assert_eq!(json["tokens"][0]["text"], "TOTAL");
    }
}
