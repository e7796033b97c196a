//! Configuration loading, validation, and management for OpsWeave.
//!
//! Loads configuration from `~/.opsweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod simulation;

pub use simulation::{FloatRange, IntRange, SimulationConfig, StepGates};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.opsweave/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP / WebSocket gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Hosted language model used by the live orchestrator
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Cycle scheduler cadence
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Snapshot broadcast cadence
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Synthetic dataset size and seed
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Probability gates and sampling ranges
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5000".into(), "http://127.0.0.1:5000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// API key. Its presence selects the live orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Total attempts per prompt, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles afterwards
    #[serde(default = "default_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "claude-3-5-sonnet-20240620".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
/// Upper bound on `inference.max_attempts`.
pub const MAX_INFERENCE_ATTEMPTS: u32 = 10;

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_request_timeout() -> u64 {
    20
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_backoff_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("base_backoff_ms", &self.base_backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cycle period without live inference
    #[serde(default = "default_simulated_interval")]
    pub simulated_interval_secs: u64,

    /// Cycle period when every step may call the hosted model
    #[serde(default = "default_live_interval")]
    pub live_interval_secs: u64,

    /// Sleep after a failed cycle before resuming
    #[serde(default = "default_failure_backoff")]
    pub failure_backoff_ms: u64,
}

fn default_simulated_interval() -> u64 {
    5
}
fn default_live_interval() -> u64 {
    30
}
fn default_failure_backoff() -> u64 {
    1_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            simulated_interval_secs: default_simulated_interval(),
            live_interval_secs: default_live_interval(),
            failure_backoff_ms: default_failure_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_broadcast_interval")]
    pub interval_ms: u64,

    /// Most recent predictions included in each snapshot
    #[serde(default = "default_snapshot_predictions")]
    pub snapshot_predictions: usize,

    /// Per-subscriber outbound queue; a full queue drops the snapshot
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

fn default_broadcast_interval() -> u64 {
    2_000
}
fn default_snapshot_predictions() -> usize {
    3
}
fn default_subscriber_buffer() -> usize {
    16
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_broadcast_interval(),
            snapshot_predictions: default_snapshot_predictions(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_clients")]
    pub clients: usize,

    #[serde(default = "default_servers")]
    pub servers: usize,

    #[serde(default = "default_incidents")]
    pub incidents: usize,

    #[serde(default = "default_decisions")]
    pub decisions: usize,

    /// Seed for both the dataset and the simulation RNG. Unset = entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_clients() -> usize {
    500
}
fn default_servers() -> usize {
    2_000
}
fn default_incidents() -> usize {
    800
}
fn default_decisions() -> usize {
    300
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            clients: default_clients(),
            servers: default_servers(),
            incidents: default_incidents(),
            decisions: default_decisions(),
            seed: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.opsweave/config.toml).
    ///
    /// Also checks environment variables:
    /// - `OPSWEAVE_API_KEY`, then `ANTHROPIC_API_KEY`
    /// - `OPSWEAVE_MODEL`
    /// - `OPSWEAVE_PORT`
    /// - `OPSWEAVE_SEED`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.inference.api_key.is_none() {
            self.inference.api_key = env("OPSWEAVE_API_KEY")
                .or_else(|| env("ANTHROPIC_API_KEY"))
                .filter(|k| !k.trim().is_empty());
        }

        if let Some(model) = env("OPSWEAVE_MODEL") {
            self.inference.model = model;
        }

        if let Some(port) = env("OPSWEAVE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("OPSWEAVE_PORT is not a port: {port}"))
            })?;
        }

        if let Some(seed) = env("OPSWEAVE_SEED") {
            self.dataset.seed = Some(seed.parse().map_err(|_| {
                ConfigError::ValidationError(format!("OPSWEAVE_SEED is not a u64: {seed}"))
            })?);
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".opsweave")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.inference.temperature) {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.inference.max_attempts == 0 || self.inference.max_attempts > MAX_INFERENCE_ATTEMPTS {
            return Err(ConfigError::ValidationError(format!(
                "inference.max_attempts must be between 1 and {MAX_INFERENCE_ATTEMPTS}"
            )));
        }

        if self.inference.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "inference.request_timeout_secs must be > 0".into(),
            ));
        }

        if self.scheduler.simulated_interval_secs == 0 || self.scheduler.live_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler intervals must be > 0".into(),
            ));
        }

        if self.broadcast.interval_ms == 0 || self.broadcast.subscriber_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "broadcast.interval_ms and broadcast.subscriber_buffer must be > 0".into(),
            ));
        }

        if self.dataset.clients == 0 || self.dataset.servers == 0 {
            return Err(ConfigError::ValidationError(
                "dataset needs at least one client and one server".into(),
            ));
        }

        self.simulation
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("simulation: {e}")))?;

        Ok(())
    }

    /// Whether live-inference credentials are present.
    pub fn has_api_key(&self) -> bool {
        self.inference.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.scheduler.simulated_interval_secs, 5);
        assert_eq!(config.scheduler.live_interval_secs, 30);
        assert_eq!(config.inference.max_attempts, 3);
        assert!(!config.has_api_key());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.simulation, config.simulation);
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AppConfig::default();
        config.inference.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn attempts_are_capped() {
        let mut config = AppConfig::default();
        config.inference.max_attempts = MAX_INFERENCE_ATTEMPTS;
        assert!(config.validate().is_ok());
        config.inference.max_attempts = MAX_INFERENCE_ATTEMPTS + 1;
        assert!(config.validate().unwrap_err().to_string().contains("max_attempts"));
    }

    #[test]
    fn zero_request_timeout_rejected() {
        let mut config = AppConfig::default();
        config.inference.request_timeout_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn non_finite_drift_rejected_through_app_config() {
        let config: AppConfig = toml::from_str(
            r#"
[simulation]
accuracy_drift = { min = -0.1, max = inf }
"#,
        )
        .unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("accuracy_drift"));
    }

    #[test]
    fn invalid_gate_rejected_through_app_config() {
        let mut config = AppConfig::default();
        config.simulation.gates.learning = -0.2;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("simulation"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().gateway.port, 8000);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[gateway]
port = 9100

[scheduler]
simulated_interval_secs = 2

[dataset]
servers = 40
seed = 7
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.scheduler.simulated_interval_secs, 2);
        assert_eq!(config.scheduler.live_interval_secs, 30);
        assert_eq!(config.dataset.servers, 40);
        assert_eq!(config.dataset.seed, Some(7));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gateway\nport = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("OPSWEAVE_PORT", "9001"),
            ("OPSWEAVE_SEED", "42"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.inference.api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(config.gateway.port, 9001);
        assert_eq!(config.dataset.seed, Some(42));
        assert!(config.has_api_key());
    }

    #[test]
    fn blank_api_key_env_is_ignored() {
        let mut config = AppConfig::default();
        config
            .apply_env(|k| (k == "OPSWEAVE_API_KEY").then(|| "  ".to_string()))
            .unwrap();
        assert!(!config.has_api_key());
    }

    #[test]
    fn bad_port_env_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|k| (k == "OPSWEAVE_PORT").then(|| "eighty".to_string()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.inference.api_key = Some("sk-ant-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("8000"));
        assert!(toml_str.contains("[simulation.gates]"));
    }
}
