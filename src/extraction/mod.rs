//! Document classification and field extraction
//!
//! Both steps send the page image to a [`VisionModel`](crate::llm::VisionModel)
//! and parse its JSON answer into the types in [`schema`].

pub mod classify;
pub mod extract;
pub mod schema;

pub use classify::classify_document;
pub use extract::extract_data;
pub use schema::{
    format_amount, Classification, DocumentType, ExtractedData, ExtractedField, LineItem, Receipt,
};

use thiserror::Error;

use crate::llm::LlmError;

/// Classification or extraction failures
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("Could not parse model output: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

/// Strip a Markdown code fence the model may wrap JSON in
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    use crate::llm::{GenerateRequest, LlmError, VisionModel};

    /// Replays canned answers and records the prompts it saw
    #[derive(Default)]
    pub struct ScriptedModel {
        answers: Mutex<VecDeque<Result<String, LlmError>>>,
        pub prompts: Mutex<Vec<(String, bool)>>,
    }

    impl ScriptedModel {
        pub fn answering(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| Ok(a.to_string())).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: LlmError) -> Self {
            let model = Self::default();
            model.answers.lock().push_back(Err(error));
            model
        }
    }

    impl VisionModel for ScriptedModel {
        fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .push((request.prompt.to_string(), request.response_schema.is_some()));
            self.answers
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::EmptyResponse("script exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }
}
