//! Per-type data extraction

use tracing::{debug, info};

use super::{strip_code_fence, DocumentType, ExtractedData, ExtractionError, Receipt};
use crate::llm::prompts::{extraction_prompt, extraction_schema};
use crate::llm::{GenerateRequest, VisionModel};

/// Extract data for an already classified page.
///
/// Receipts are requested with the receipt schema and parsed into a
/// [`Receipt`]. Other types have no schema and keep the model's transcription
/// in `raw_text`.
pub fn extract_data(
    model: &dyn VisionModel,
    image_png: &[u8],
    doc_type: DocumentType,
) -> Result<ExtractedData, ExtractionError> {
    let schema = extraction_schema(doc_type);
    let mut request = GenerateRequest::text(extraction_prompt(doc_type)).with_image(image_png);
    if let Some(schema) = schema.as_ref() {
        request = request.with_schema(schema);
    }

    let answer = model.generate(&request)?;
    debug!("Extraction answer: {answer}");

    let mut data = ExtractedData::empty(doc_type);
    match doc_type {
        DocumentType::Receipt => {
            let receipt: Receipt = serde_json::from_str(strip_code_fence(&answer)).map_err(|source| {
                ExtractionError::Parse {
                    source,
                    raw: answer.clone(),
                }
            })?;
            info!(
                "Extracted receipt from {} ({} items, total {} {})",
                receipt.merchant_name,
                receipt.items.len(),
                receipt.total_amount,
                receipt.currency
            );
            data.receipt = Some(receipt);
        }
        _ => {
            info!("Extracted {} chars of text for {}", answer.len(), doc_type);
            data.raw_text = Some(answer.trim().to_string());
        }
    }

    Ok(data)
}
