//! Grounding
//!
//! Links extracted field values back to their location on the page by
//! matching them against OCR tokens.

pub mod matcher;
pub mod scoring;

pub use matcher::{TokenMatcher, DEFAULT_MATCH_THRESHOLD};
pub use scoring::{ScoreFn, Scorer};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::extraction::ExtractedField;
use crate::vision::{OcrResult, Polygon};

/// A polygon to outline on the image, with the field it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedAnnotation {
    pub polygon: Polygon,
    pub label: String,
}

impl GroundedAnnotation {
    pub fn new(polygon: Polygon, label: impl Into<String>) -> Self {
        Self {
            polygon,
            label: label.into(),
        }
    }
}

/// Match every field against the OCR tokens; unmatched fields are skipped
pub fn ground_fields<S: ScoreFn>(
    fields: &[ExtractedField],
    ocr: &OcrResult,
    matcher: &TokenMatcher<S>,
) -> Vec<GroundedAnnotation> {
    let annotations: Vec<GroundedAnnotation> = fields
        .iter()
        .filter_map(|field| match matcher.find_match(&field.value, &ocr.tokens) {
            Some(hit) => {
                debug!("{} located on token #{} ({:?})", field.name, hit.index, hit.kind);
                Some(GroundedAnnotation::new(hit.token.polygon.clone(), field.name.clone()))
            }
            None => {
                debug!("Nothing to draw for {} ({:?})", field.name, field.value);
                None
            }
        })
        .collect();

    info!("Grounded {}/{} fields", annotations.len(), fields.len());
    annotations
}
