//! Prompts and response schemas
//!
//! Schemas use the OpenAPI subset accepted by `responseSchema`.

use serde_json::{json, Value};

use crate::extraction::DocumentType;

pub const CLASSIFICATION_PROMPT: &str = "\
Analyze this image and classify the document type.
Choose exactly one of: receipt, invoice, id_card, other.
Give a one-sentence reasoning for your choice.";

pub const RECEIPT_PROMPT: &str = "\
Extract data from this receipt.
- Identify the Merchant Name, and its address, phone number and tax ID if printed.
- Extract the Date exactly as printed.
- Extract the Total Amount as a number and the Currency as an ISO 4217 code.
- Extract all Line Items with description, quantity, unit price and line total.
Copy text as it appears on the document; do not translate or normalize it.";

const INVOICE_PROMPT: &str = "Extract invoice data. Transcribe all visible text, keeping the layout.";
const ID_CARD_PROMPT: &str = "Transcribe all visible text on this identity document, keeping the layout.";
const OTHER_PROMPT: &str = "Extract all visible text.";

/// Free-text extraction prompt for a document type
pub fn extraction_prompt(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::Receipt => RECEIPT_PROMPT,
        DocumentType::Invoice => INVOICE_PROMPT,
        DocumentType::IdCard => ID_CARD_PROMPT,
        DocumentType::Other => OTHER_PROMPT,
    }
}

/// Schema for `{document_type, reasoning}`
pub fn classification_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "document_type": {
                "type": "STRING",
                "enum": DocumentType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>()
            },
            "reasoning": { "type": "STRING" }
        },
        "required": ["document_type", "reasoning"],
        "propertyOrdering": ["document_type", "reasoning"]
    })
}

/// Schema for a receipt record
pub fn receipt_schema() -> Value {
    let optional_string = json!({ "type": "STRING", "nullable": true });
    let optional_number = json!({ "type": "NUMBER", "nullable": true });

    json!({
        "type": "OBJECT",
        "properties": {
            "merchant_name": { "type": "STRING" },
            "merchant_address": optional_string,
            "merchant_phone": optional_string,
            "merchant_tax_id": optional_string,
            "date": optional_string,
            "total_amount": { "type": "NUMBER" },
            "currency": { "type": "STRING", "nullable": true, "description": "ISO 4217 code, USD if not printed" },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": { "type": "STRING" },
                        "quantity": optional_number,
                        "price": optional_number,
                        "total": optional_number
                    },
                    "required": ["description"]
                }
            }
        },
        "required": ["merchant_name", "total_amount"]
    })
}

/// Structured schema for a document type, if it has one
pub fn extraction_schema(doc_type: DocumentType) -> Option<Value> {
    match doc_type {
        DocumentType::Receipt => Some(receipt_schema()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_schema_lists_all_types() {
        let schema = classification_schema();
        let values = schema["properties"]["document_type"]["enum"].as_array().unwrap();
        assert_eq!(values.len(), 4);
        assert!(values.iter().any(|v| v == "id_card"));
    }

    #[test]
    fn test_receipt_schema_required_fields() {
        let schema = receipt_schema();
        assert_eq!(schema["required"], json!(["merchant_name", "total_amount"]));
        assert_eq!(schema["properties"]["items"]["items"]["required"], json!(["description"]));
    }

    #[test]
    fn test_only_receipts_have_a_schema() {
        assert!(extraction_schema(DocumentType::Receipt).is_some());
        assert!(extraction_schema(DocumentType::Invoice).is_none());
        assert!(extraction_schema(DocumentType::Other).is_none());
    }
}
