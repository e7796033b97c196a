//! Reasoning text for agent records.
//!
//! The advisor asks the inference client when one is configured and falls
//! back to rule-based text otherwise, or when the call fails. Callers always
//! get non-empty text and never see an inference error.

use opsweave_core::{InferenceClient, InferenceRequest};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::StateStore;

/// Rule-based stand-in for a model answer, keyed on the prompt's intent.
pub fn fallback_text(prompt: &str) -> String {
    let prompt = prompt.to_lowercase();
    let value = if prompt.contains("predict") {
        serde_json::json!({
            "prediction": "Server failure predicted in 36 hours",
            "confidence": 84,
            "recommended_action": "Schedule preventive maintenance"
        })
    } else if prompt.contains("analyze") {
        serde_json::json!({
            "analysis": "Resource utilization trending upward",
            "recommendation": "Consider capacity upgrade",
            "priority": "medium"
        })
    } else {
        serde_json::json!({
            "decision": "Approved for execution",
            "reasoning": "ROI positive, low risk",
            "confidence": 92
        })
    };
    value.to_string()
}

#[derive(Clone, Default)]
pub struct Advisor {
    client: Option<Arc<dyn InferenceClient>>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Advisor {
    /// Rule-based text only. No calls, no usage accounting.
    pub fn simulated() -> Self {
        Self::default()
    }

    pub fn live(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client.as_deref().map(|c| c.name())
    }

    /// Reasoning for `request`. Live calls are recorded in the store's
    /// inference counters, failures included.
    pub async fn reason(&self, store: &StateStore, mut request: InferenceRequest) -> String {
        let Some(client) = &self.client else {
            return fallback_text(&request.prompt);
        };

        if let Some(t) = self.temperature {
            request.temperature = t;
        }
        if request.max_tokens.is_none() {
            request.max_tokens = self.max_tokens;
        }

        let prompt = request.prompt.clone();
        match client.invoke(request).await {
            Ok(response) => {
                debug!(client = client.name(), model = %response.model, "Inference answered");
                store.record_inference(response.usage, false);
                response.text
            }
            Err(e) => {
                warn!(client = client.name(), error = %e, "Inference failed, using rule-based text");
                store.record_inference(None, true);
                fallback_text(&prompt)
            }
        }
    }
}
