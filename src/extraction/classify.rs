//! Document type classification

use tracing::{info, warn};

use super::{strip_code_fence, Classification, DocumentType, ExtractionError};
use crate::llm::prompts::{classification_schema, CLASSIFICATION_PROMPT};
use crate::llm::{GenerateRequest, VisionModel};

/// Ask the model which kind of document the page shows.
///
/// The answer is requested as `{document_type, reasoning}` JSON. If the model
/// ignores the schema, the type is recovered by scanning the text for a known
/// keyword, and `Other` is used when none is found. Transport and API errors are
/// returned as-is.
pub fn classify_document(
    model: &dyn VisionModel,
    image_png: &[u8],
) -> Result<Classification, ExtractionError> {
    let schema = classification_schema();
    let request = GenerateRequest::text(CLASSIFICATION_PROMPT)
        .with_image(image_png)
        .with_schema(&schema);

    let answer = model.generate(&request)?;

    let classification = match serde_json::from_str::<Classification>(strip_code_fence(&answer)) {
        Ok(classification) => classification,
        Err(e) => {
            warn!("Classifier answer was not valid JSON ({e}), scanning for keywords");
            Classification {
                document_type: keyword_document_type(&answer),
                reasoning: answer.trim().to_string(),
            }
        }
    };

    info!("Classified as {}", classification.document_type);
    Ok(classification)
}

/// Recover a document type from free text
pub fn keyword_document_type(text: &str) -> DocumentType {
    let text = text.to_lowercase();
    if text.contains("receipt") {
        DocumentType::Receipt
    } else if text.contains("invoice") {
        DocumentType::Invoice
    } else if text.contains("id_card") || text.contains("id card") {
        DocumentType::IdCard
    } else {
        DocumentType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::testing::ScriptedModel;
    use crate::llm::LlmError;

    #[test]
    fn test_structured_answer() {
        let model = ScriptedModel::answering(&[
            r#"{"document_type": "receipt", "reasoning": "Itemized purchase with a total."}"#,
        ]);

        let classification = classify_document(&model, b"png").unwrap();

        assert_eq!(classification.document_type, DocumentType::Receipt);
        assert_eq!(classification.reasoning, "Itemized purchase with a total.");
        let prompts = model.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1, "classification should request a schema");
    }

    #[test]
    fn test_fenced_answer() {
        let model = ScriptedModel::answering(&["```json\n{\"document_type\": \"id_card\"}\n```"]);
        let classification = classify_document(&model, b"png").unwrap();
        assert_eq!(classification.document_type, DocumentType::IdCard);
        assert!(classification.reasoning.is_empty());
    }

    #[test]
    fn test_free_text_answer_uses_keywords() {
        let model = ScriptedModel::answering(&["This looks like an INVOICE from a supplier."]);
        let classification = classify_document(&model, b"png").unwrap();
        assert_eq!(classification.document_type, DocumentType::Invoice);
        assert_eq!(classification.reasoning, "This looks like an INVOICE from a supplier.");
    }

    #[test]
    fn test_unknown_type_in_json_falls_back_to_keywords() {
        let model = ScriptedModel::answering(&[r#"{"document_type": "passport", "reasoning": "x"}"#]);
        let classification = classify_document(&model, b"png").unwrap();
        assert_eq!(classification.document_type, DocumentType::Other);
    }

    #[test]
    fn test_transport_error_is_surfaced() {
        let model = ScriptedModel::failing(LlmError::Api {
            status: 403,
            message: "denied".to_string(),
        });
        let err = classify_document(&model, b"png").unwrap_err();
        assert!(matches!(err, ExtractionError::Model(LlmError::Api { status: 403, .. })));
    }

    #[test]
    fn test_keyword_document_type() {
        assert_eq!(keyword_document_type("a grocery receipt"), DocumentType::Receipt);
        assert_eq!(keyword_document_type("Driver ID card"), DocumentType::IdCard);
        assert_eq!(keyword_document_type("a letter"), DocumentType::Other);
    }
}
