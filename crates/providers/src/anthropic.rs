//! Anthropic Messages API client.
//!
//! Non-streaming only: each agent step sends one user message (prompt plus
//! rendered context) and waits for the complete reply.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - Role framing sent as the top-level `system` field

use async_trait::async_trait;
use opsweave_config::InferenceConfig;
use opsweave_core::error::InferenceError;
use opsweave_core::inference::{InferenceClient, InferenceRequest, InferenceResponse, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = "You are an autonomous operations agent for a managed service \
provider. Answer with concise, concrete technical reasoning.";

/// Anthropic native Messages API client.
pub struct AnthropicClient {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a client for `model` with a request-level timeout.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client,
        })
    }

    /// Build from the `[inference]` config section. Fails without an API key.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| InferenceError::NotConfigured("no inference API key".into()))?;

        let mut client = Self::new(
            api_key,
            config.model.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        client.max_tokens = config.max_tokens;
        if let Some(url) = &config.api_url {
            client = client.with_base_url(url.clone());
        }
        Ok(client)
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &InferenceRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: request.full_prompt(),
            }],
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature,
        }
    }

    fn into_response(resp: MessagesResponse) -> Result<InferenceResponse, InferenceError> {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }

        Ok(InferenceResponse {
            text,
            usage: Some(Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            }),
            model: resp.model,
            stop_reason: resp.stop_reason,
        })
    }
}

#[async_trait]
impl InferenceClient for AnthropicClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        request: InferenceRequest,
    ) -> std::result::Result<InferenceResponse, InferenceError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(&request);

        debug!(provider = "anthropic", model = %self.model, "Sending inference request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(e.to_string())
                } else {
                    InferenceError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(InferenceError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(InferenceError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(InferenceError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| InferenceError::ApiError {
                    status_code: 200,
                    message: format!("Failed to parse Anthropic response: {e}"),
                })?;

        Self::into_response(api_resp)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ResponseBlock>,
    usage: ApiUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}
