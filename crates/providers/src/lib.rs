//! Inference client implementations for OpsWeave.
//!
//! All clients implement the `opsweave_core::InferenceClient` trait.
//! [`build_client`] wires the hosted client inside the retry wrapper.

pub mod anthropic;
pub mod retry;

pub use anthropic::AnthropicClient;
pub use retry::RetryingClient;

use opsweave_config::InferenceConfig;
use opsweave_core::InferenceClient;
use opsweave_core::error::InferenceError;
use std::sync::Arc;

/// The live client for `config`: Anthropic behind bounded retries.
pub fn build_client(config: &InferenceConfig) -> Result<Arc<dyn InferenceClient>, InferenceError> {
    let hosted: Arc<dyn InferenceClient> = Arc::new(AnthropicClient::from_config(config)?);
    Ok(Arc::new(RetryingClient::from_config(hosted, config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_needs_key() {
        assert!(build_client(&InferenceConfig::default()).is_err());

        let config = InferenceConfig {
            api_key: Some("sk-ant-x".into()),
            ..InferenceConfig::default()
        };
        let client = build_client(&config).unwrap();
        assert_eq!(client.name(), "retrying(anthropic)");
    }
}
