//! Gemini `generateContent` client

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{GenerateRequest, LlmError, VisionModel};
use crate::config::LlmSettings;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini REST client with a blocking API
pub struct GeminiClient {
    http: reqwest::Client,
    runtime: Runtime,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, settings: &LlmSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LlmError::Runtime)?;

        Ok(Self {
            http,
            runtime,
            api_key: api_key.into(),
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn generate_async(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError> {
        let body = build_request_body(request);
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        parse_generate_response(&text)
    }
}

impl VisionModel for GeminiClient {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError> {
        info!(
            "Calling {} ({}, structured: {})",
            self.model,
            if request.image_png.is_some() { "with image" } else { "text only" },
            request.response_schema.is_some()
        );
        let text = self.runtime.block_on(self.generate_async(request))?;
        debug!("Model answered with {} chars", text.len());
        Ok(text)
    }
}

/// Build the JSON body for `generateContent`
pub fn build_request_body(request: &GenerateRequest<'_>) -> serde_json::Value {
    let mut parts = vec![serde_json::json!({ "text": request.prompt })];
    if let Some(png) = request.image_png {
        parts.push(serde_json::json!({
            "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(png) }
        }));
    }

    let mut body = serde_json::json!({
        "contents": [{ "role": "user", "parts": parts }]
    });

    if let Some(schema) = request.response_schema {
        body["generationConfig"] = serde_json::json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }

    body
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Concatenate the text parts of the first candidate
pub fn parse_generate_response(body: &str) -> Result<String, LlmError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(LlmError::EmptyResponse(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(LlmError::EmptyResponse(reason));
    }

    Ok(text)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}
