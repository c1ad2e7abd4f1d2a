//! Pipeline Coordinator
//!
//! Runs one extraction over a document image: OCR, classification,
//! extraction, grounding and rendering, in that order.

use image::RgbaImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::document::{DocumentError, DocumentImage};
use crate::extraction::{
    classify_document, extract_data, Classification, ExtractedData, ExtractionError,
};
use crate::grounding::{ground_fields, GroundedAnnotation, Scorer, TokenMatcher};
use crate::llm::{GeminiClient, LlmError, VisionModel};
use crate::render::{render_annotations, RenderStyle};
use crate::vision::{CloudVisionClient, OcrError, OcrResult, TextDetector};

/// Any failure that aborts a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not prepare the image: {0}")]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub classification: Classification,
    pub data: ExtractedData,
    pub ocr: OcrResult,
    pub annotations: Vec<GroundedAnnotation>,
    /// Copy of the input with grounded fields outlined
    pub grounded_image: RgbaImage,
}

/// OCR pass on its own, for callers that need no model
pub fn detect_text(
    detector: &dyn TextDetector,
    document: &DocumentImage,
) -> Result<OcrResult, PipelineError> {
    let png = document.encode_png()?;
    Ok(detector.detect_text(&png)?)
}

/// Main pipeline coordinator
pub struct DocumentPipeline {
    model: Box<dyn VisionModel + Send + Sync>,
    ocr: Box<dyn TextDetector + Send + Sync>,
    matcher: TokenMatcher<Scorer>,
    style: RenderStyle,
}

impl DocumentPipeline {
    pub fn new(
        model: Box<dyn VisionModel + Send + Sync>,
        ocr: Box<dyn TextDetector + Send + Sync>,
        matcher: TokenMatcher<Scorer>,
        style: RenderStyle,
    ) -> Self {
        Self {
            model,
            ocr,
            matcher,
            style,
        }
    }

    /// Build the cloud clients from configuration.
    ///
    /// Fails before any network call when the model key is missing. Missing
    /// OCR credentials are only logged, since ambient credentials may exist.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        for warning in config.validate()? {
            warn!("{}", warning);
        }
        let api_key = config.llm_api_key().ok_or(ConfigError::MissingLlmKey)?;

        let model = GeminiClient::new(api_key, &config.llm)?;
        let ocr = CloudVisionClient::new(&config.ocr)?;
        let matcher = TokenMatcher::new(config.grounding.threshold, config.grounding.scorer);

        Ok(Self::new(
            Box::new(model),
            Box::new(ocr),
            matcher,
            RenderStyle::from(&config.render),
        ))
    }

    /// Classification only
    pub fn classify(&self, document: &DocumentImage) -> Result<Classification, PipelineError> {
        let png = document.encode_png()?;
        Ok(classify_document(self.model.as_ref(), &png)?)
    }

    /// Full extraction run
    pub fn run(&self, document: &DocumentImage) -> Result<PipelineOutput, PipelineError> {
        let png = document.encode_png()?;
        info!("Running extraction on {}x{} image", document.width(), document.height());

        let ocr = self.ocr.detect_text(&png)?;
        info!("OCR found {} tokens", ocr.tokens.len());

        let classification = classify_document(self.model.as_ref(), &png)?;
        let data = extract_data(self.model.as_ref(), &png, classification.document_type)?;

        let annotations = ground_fields(&data.fields(), &ocr, &self.matcher);
        let grounded_image = render_annotations(document.image(), &annotations, &self.style);

        Ok(PipelineOutput {
            classification,
            data,
            ocr,
            annotations,
            grounded_image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceFormat;
    use crate::extraction::testing::ScriptedModel;
    use crate::extraction::DocumentType;
    use crate::vision::{OcrToken, Polygon};
    use image::{DynamicImage, Rgba};

    struct StubOcr(Result<OcrResult, String>);

    impl TextDetector for StubOcr {
        fn detect_text(&self, _image_bytes: &[u8]) -> Result<OcrResult, OcrError> {
            self.0.clone().map_err(OcrError::Service)
        }
    }

    fn receipt_ocr() -> OcrResult {
        OcrResult {
            text: "STARBUCKS\nTotal: 42.50".to_string(),
            tokens: vec![
                OcrToken::new("STARBUCKS", Polygon::from_pairs(&[(2, 2), (30, 2), (30, 8), (2, 8)])),
                OcrToken::new("Total:", Polygon::from_pairs(&[(2, 20), (15, 20), (15, 26), (2, 26)])),
                OcrToken::new("42.50", Polygon::from_pairs(&[(20, 20), (35, 20), (35, 26), (20, 26)])),
            ],
        }
    }

    fn document() -> DocumentImage {
        let pixels = RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 255]));
        DocumentImage::new(DynamicImage::ImageRgba8(pixels), SourceFormat::Png)
    }

    fn pipeline(model: ScriptedModel, ocr: StubOcr) -> DocumentPipeline {
        DocumentPipeline::new(
            Box::new(model),
            Box::new(ocr),
            TokenMatcher::default(),
            RenderStyle::default(),
        )
    }

    #[test]
    fn test_receipt_run() {
        let model = ScriptedModel::answering(&[
            r#"{"document_type": "receipt", "reasoning": "Has a total"}"#,
            r#"{"merchant_name": "Starbucks", "total_amount": 42.5, "date": "2024-03-01"}"#,
        ]);
        let pipeline = pipeline(model, StubOcr(Ok(receipt_ocr())));

        let output = pipeline.run(&document()).unwrap();

        assert_eq!(output.classification.document_type, DocumentType::Receipt);
        assert_eq!(output.data.receipt.as_ref().unwrap().merchant_name, "Starbucks");
        let labels: Vec<&str> = output.annotations.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["Merchant", "Total"]);
        assert_eq!(output.annotations[1].polygon, receipt_ocr().tokens[2].polygon);
        assert_eq!(output.grounded_image.dimensions(), (40, 30));
        assert_ne!(output.grounded_image, document().image().to_rgba8());
    }

    #[test]
    fn test_non_receipt_run_has_no_annotations() {
        let model = ScriptedModel::answering(&[
            r#"{"document_type": "other", "reasoning": "A letter"}"#,
            "Dear customer",
        ]);
        let pipeline = pipeline(model, StubOcr(Ok(receipt_ocr())));

        let output = pipeline.run(&document()).unwrap();

        assert_eq!(output.data.raw_text.as_deref(), Some("Dear customer"));
        assert!(output.annotations.is_empty());
        assert_eq!(output.grounded_image, document().image().to_rgba8());
    }

    #[test]
    fn test_ocr_failure_aborts_before_model_calls() {
        let model = ScriptedModel::answering(&[r#"{"document_type": "receipt"}"#]);
        let pipeline = pipeline(model, StubOcr(Err("quota exceeded".to_string())));

        let err = pipeline.run(&document()).unwrap_err();

        assert!(matches!(err, PipelineError::Ocr(OcrError::Service(_))));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_extraction_parse_failure_aborts() {
        let model = ScriptedModel::answering(&[r#"{"document_type": "receipt"}"#, "not json"]);
        let pipeline = pipeline(model, StubOcr(Ok(receipt_ocr())));

        let err = pipeline.run(&document()).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Parse { .. })));
    }

    #[test]
    fn test_detect_text_without_a_model() {
        let result = detect_text(&StubOcr(Ok(receipt_ocr())), &document()).unwrap();
        assert_eq!(result, receipt_ocr());

        let err = detect_text(&StubOcr(Err("bad key".to_string())), &document()).unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_from_config_requires_model_key() {
        let err = DocumentPipeline::from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, PipelineError::Config(ConfigError::MissingLlmKey)));
    }

    #[test]
    fn test_from_config_without_ocr_credentials() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("test-key".to_string());
        assert!(DocumentPipeline::from_config(&config).is_ok());
    }
}
