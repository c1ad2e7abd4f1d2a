//! Multimodal language model access
//!
//! A [`VisionModel`] takes a prompt, an optional page image and an optional
//! JSON response schema, and returns the model's text. Classification and
//! extraction only depend on this trait, so any backend that satisfies it is
//! substitutable.

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiClient;

use thiserror::Error;

/// One generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    /// PNG-encoded page image
    pub image_png: Option<&'a [u8]>,
    /// Constrain the answer to this JSON schema
    pub response_schema: Option<&'a serde_json::Value>,
}

impl<'a> GenerateRequest<'a> {
    pub fn text(prompt: &'a str) -> Self {
        Self {
            prompt,
            image_png: None,
            response_schema: None,
        }
    }

    pub fn with_image(mut self, image_png: &'a [u8]) -> Self {
        self.image_png = Some(image_png);
        self
    }

    pub fn with_schema(mut self, schema: &'a serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Model call failures
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model returned no content: {0}")]
    EmptyResponse(String),

    #[error("Unexpected model response: {0}")]
    InvalidResponse(String),

    #[error("Failed to start model runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// A hosted multimodal model
pub trait VisionModel {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError>;
}
