//! Inference trait — the abstraction over the hosted language model.
//!
//! Agents hand a role-specific prompt (plus optional structured context) to
//! an [`InferenceClient`] and get generated text back, or a failure. Retry
//! and backoff are the client's responsibility; callers only decide what to
//! do when the final answer is an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// A single prompt sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Role-specific natural-language prompt
    pub prompt: String,

    /// Structured context appended to the prompt as pretty JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    /// Sampling temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// The prompt with its context block appended, as sent on the wire.
    pub fn full_prompt(&self) -> String {
        match &self.context {
            Some(ctx) => {
                let rendered = serde_json::to_string_pretty(ctx).unwrap_or_default();
                format!("{}\n\nContext:\n{rendered}", self.prompt)
            }
            None => self.prompt.clone(),
        }
    }
}

/// A successful model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// The generated text
    pub text: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,

    /// Why generation stopped, when the provider says
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// The external inference collaborator.
///
/// The hosted model, the retry wrapper around it, and test doubles all
/// implement this trait; agent steps never know which one they talk to.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// A human-readable name (e.g., "anthropic", "retrying(anthropic)").
    fn name(&self) -> &str;

    /// Send a prompt and wait for the complete response.
    async fn invoke(
        &self,
        request: InferenceRequest,
    ) -> std::result::Result<InferenceResponse, InferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let req = InferenceRequest::new("Predict failures");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.context.is_none());
        assert_eq!(req.full_prompt(), "Predict failures");
    }

    #[test]
    fn full_prompt_appends_context() {
        let req = InferenceRequest::new("Evaluate").with_context(serde_json::json!({
            "server": "DB-PROD-03"
        }));
        let prompt = req.full_prompt();
        assert!(prompt.starts_with("Evaluate\n\nContext:\n"));
        assert!(prompt.contains("DB-PROD-03"));
    }

    #[test]
    fn usage_total() {
        let usage = Usage {
            input_tokens: 120,
            output_tokens: 30,
        };
        assert_eq!(usage.total(), 150);
    }
}
