//! Error types for the OpsWeave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all OpsWeave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Agent step errors ---
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    // --- Cycle errors ---
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    // --- Subscriber delivery errors ---
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    // --- Dataset errors ---
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the hosted language-model call. Always recovered locally by
/// the calling step with a rule-based fallback text.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Inference not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned no text")]
    EmptyResponse,
}

impl InferenceError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::RateLimited { .. }
            | InferenceError::Timeout(_)
            | InferenceError::Network(_) => true,
            InferenceError::ApiError { status_code, .. } => *status_code >= 500,
            InferenceError::AuthenticationFailed(_)
            | InferenceError::NotConfigured(_)
            | InferenceError::EmptyResponse => false,
        }
    }
}

/// A single agent step could not produce its record this cycle.
/// The cycle logs it and moves on to the next step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{step}: no candidates ({reason})")]
    NoCandidates { step: &'static str, reason: String },

    #[error("{step}: missing input from an earlier step ({input})")]
    MissingInput { step: &'static str, input: &'static str },

    #[error("{step} failed: {reason}")]
    Failed { step: &'static str, reason: String },
}

/// A whole cycle died before producing its report. The scheduler logs it,
/// backs off, and runs the next cycle on schedule.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("cycle {cycle} panicked: {message}")]
    Panicked { cycle: u64, message: String },

    #[error("cycle {cycle} was cancelled")]
    Cancelled { cycle: u64 },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Subscriber {0} is gone")]
    Closed(String),

    #[error("Subscriber {0} is not keeping up, snapshot dropped")]
    Lagging(String),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset has no {0}")]
    Empty(&'static str),

    #[error("Invalid dataset request: {0}")]
    Invalid(String),
}
