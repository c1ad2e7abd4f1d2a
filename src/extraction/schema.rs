//! Extraction data types

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document categories the classifier can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Receipt,
    Invoice,
    IdCard,
    #[default]
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Receipt,
        DocumentType::Invoice,
        DocumentType::IdCard,
        DocumentType::Other,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Receipt => "receipt",
            DocumentType::Invoice => "invoice",
            DocumentType::IdCard => "id_card",
            DocumentType::Other => "other",
        }
    }

    /// Display name for UIs
    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentType::Receipt => "Receipt",
            DocumentType::Invoice => "Invoice",
            DocumentType::IdCard => "ID Card",
            DocumentType::Other => "Other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown document type: {s}"))
    }
}

/// Classifier answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub document_type: DocumentType,
    #[serde(default)]
    pub reasoning: String,
}

/// One receipt line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// Structured receipt record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub merchant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_tax_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub total_amount: f64,
    #[serde(default = "default_currency", deserialize_with = "currency_or_default")]
    pub currency: String,
    #[serde(default, deserialize_with = "items_or_empty")]
    pub items: Vec<LineItem>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn currency_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(default_currency))
}

fn items_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<LineItem>, D::Error> {
    Ok(Option::<Vec<LineItem>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named value to ground on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: String,
}

impl ExtractedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Receipt {
    /// Fields worth locating on the page, skipping blank values and a zero total
    pub fn fields(&self) -> Vec<ExtractedField> {
        let mut fields = Vec::new();
        let mut push = |name: &str, value: Option<&str>| {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                fields.push(ExtractedField::new(name, value));
            }
        };

        push("Merchant", Some(&self.merchant_name));
        push("Date", self.date.as_deref());
        let total = (self.total_amount != 0.0).then(|| format_amount(self.total_amount));
        push("Total", total.as_deref());
        push("Address", self.merchant_address.as_deref());
        push("Phone", self.merchant_phone.as_deref());
        push("Tax ID", self.merchant_tax_id.as_deref());

        fields
    }
}

/// Shortest decimal form of an amount, keeping one decimal on whole
/// numbers (`42.5`, `42.0`)
pub fn format_amount(amount: f64) -> String {
    if amount.is_finite() && amount.fract() == 0.0 {
        format!("{amount:.1}")
    } else {
        format!("{amount}")
    }
}

/// Everything extracted from one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub document_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    /// Free-text transcription for types without a structured schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl ExtractedData {
    pub fn empty(document_type: DocumentType) -> Self {
        Self {
            document_type,
            receipt: None,
            raw_text: None,
        }
    }

    /// Flat list of groundable fields
    pub fn fields(&self) -> Vec<ExtractedField> {
        self.receipt.as_ref().map(Receipt::fields).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_wire_names() {
        assert_eq!(serde_json::to_string(&DocumentType::IdCard).unwrap(), "\"id_card\"");
        assert_eq!("RECEIPT".parse::<DocumentType>().unwrap(), DocumentType::Receipt);
        assert!("passport".parse::<DocumentType>().is_err());
        assert_eq!(DocumentType::IdCard.to_string(), "id_card");
    }

    #[test]
    fn test_receipt_minimal_payload() {
        let receipt: Receipt =
            serde_json::from_str(r#"{"merchant_name": "Starbucks", "total_amount": 42.5}"#).unwrap();

        assert_eq!(receipt.currency, "USD");
        assert!(receipt.items.is_empty());
        assert!(receipt.date.is_none());
    }

    #[test]
    fn test_receipt_nulls_fall_back_to_defaults() {
        let receipt: Receipt = serde_json::from_str(
            r#"{"merchant_name": "Cafe", "total_amount": 3, "currency": null, "items": null, "date": null}"#,
        )
        .unwrap();

        assert_eq!(receipt.currency, "USD");
        assert!(receipt.items.is_empty());
    }

    #[test]
    fn test_receipt_missing_required_field_fails() {
        let result = serde_json::from_str::<Receipt>(r#"{"merchant_name": "Cafe"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_line_item_optional_numbers() {
        let item: LineItem = serde_json::from_str(r#"{"description": "Latte", "price": 4.25}"#).unwrap();
        assert_eq!(item.price, Some(4.25));
        assert!(item.quantity.is_none());
        assert!(item.total.is_none());
    }

    #[test]
    fn test_receipt_fields() {
        let receipt = Receipt {
            merchant_name: "Starbucks".to_string(),
            merchant_address: Some("  ".to_string()),
            merchant_phone: Some("555-0100".to_string()),
            merchant_tax_id: None,
            date: Some("03/01/2024".to_string()),
            total_amount: 42.5,
            currency: "USD".to_string(),
            items: vec![],
        };

        let names: Vec<String> = receipt.fields().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Merchant", "Date", "Total", "Phone"]);
        assert_eq!(receipt.fields()[2].value, "42.5");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(42.5), "42.5");
        assert_eq!(format_amount(42.0), "42.0");
        assert_eq!(format_amount(0.99), "0.99");
        assert_eq!(format_amount(-3.0), "-3.0");
    }

    #[test]
    fn test_zero_total_is_not_grounded() {
        let receipt: Receipt =
            serde_json::from_str(r#"{"merchant_name": "Cafe Uno", "total_amount": 0}"#).unwrap();

        let fields = receipt.fields();

        assert_eq!(fields, vec![ExtractedField::new("Merchant", "Cafe Uno")]);
    }

    #[test]
    fn test_whole_total_keeps_a_decimal() {
        let receipt: Receipt =
            serde_json::from_str(r#"{"merchant_name": "Store", "total_amount": 42}"#).unwrap();
        assert_eq!(receipt.fields()[1], ExtractedField::new("Total", "42.0"));
    }

    #[test]
    fn test_extracted_data_without_receipt_has_no_fields() {
        let data = ExtractedData::empty(DocumentType::Invoice);
        assert!(data.fields().is_empty());
    }
}
