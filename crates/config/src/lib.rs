//! Configuration loading, validation, and management for Codeweaver.
//!
//! Loads configuration from `~/.codeweaver/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codeweaver/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference endpoint and retry policy
    #[serde(default)]
    pub model: ModelConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Database configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Principal resolution
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Chat-completions URL
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token for the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Outer attempt budget
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Generation-length budget at the start of every attempt
    #[serde(default = "default_initial_max_tokens")]
    pub initial_max_tokens: u32,

    /// Hard ceiling for the generation-length budget
    #[serde(default = "default_max_cap_tokens")]
    pub max_cap_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Wait used when a 503 body carries no `estimated_time`
    #[serde(default = "default_load_wait_secs")]
    pub default_load_wait_secs: f64,

    /// Pause before re-requesting with a doubled budget
    #[serde(default = "default_length_retry_pause_ms")]
    pub length_retry_pause_ms: u64,

    /// Linear backoff unit; the pause is `attempt * backoff_unit_ms`
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Timeout for a single HTTP exchange
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint_url() -> String {
    "https://router.huggingface.co/v1/chat/completions".into()
}
fn default_model() -> String {
    "openai/gpt-oss-20b".into()
}
fn default_retries() -> u32 {
    3
}
fn default_initial_max_tokens() -> u32 {
    800
}
fn default_max_cap_tokens() -> u32 {
    8000
}
fn default_temperature() -> f32 {
    0.1
}
fn default_top_p() -> f32 {
    1.0
}
fn default_load_wait_secs() -> f64 {
    10.0
}
fn default_length_retry_pause_ms() -> u64 {
    500
}
fn default_backoff_unit_ms() -> u64 {
    1000
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            model: default_model(),
            api_key: None,
            retries: default_retries(),
            initial_max_tokens: default_initial_max_tokens(),
            max_cap_tokens: default_max_cap_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            default_load_wait_secs: default_load_wait_secs(),
            length_retry_pause_ms: default_length_retry_pause_ms(),
            backoff_unit_ms: default_backoff_unit_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("retries", &self.retries)
            .field("initial_max_tokens", &self.initial_max_tokens)
            .field("max_cap_tokens", &self.max_cap_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("default_load_wait_secs", &self.default_load_wait_secs)
            .field("length_retry_pause_ms", &self.length_retry_pause_ms)
            .field("backoff_unit_ms", &self.backoff_unit_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed by CORS. Empty = same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Upper bound on one whole model-client run. Unset = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
            body_limit_bytes: default_body_limit(),
            generation_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `sqlite://path/to.db`, `sqlite::memory:`, or `memory` for the
    /// non-persistent in-process store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    format!(
        "sqlite://{}",
        AppConfig::config_dir().join("codeweaver.db").display()
    )
}
fn default_max_connections() -> u32 {
    4
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Attribute unauthenticated generate requests to a shared placeholder
    /// user instead of rejecting them.
    #[serde(default)]
    pub allow_anonymous: bool,

    /// Header carrying the subject id set by a trusted auth proxy.
    /// Unset = the header is ignored. Only set this when the gateway is
    /// reachable through the proxy alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_header: Option<String>,

    /// Static bearer token → subject id
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_anonymous: false,
            principal_header: None,
            tokens: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("allow_anonymous", &self.allow_anonymous)
            .field("principal_header", &self.principal_header)
            .field("tokens", &format!("[{} REDACTED]", self.tokens.len()))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codeweaver/config.toml),
    /// then apply environment overrides:
    /// - `CODEWEAVER_API_KEY` (highest priority), then `HF_TOKEN`
    /// - `CODEWEAVER_MODEL`, `CODEWEAVER_ENDPOINT`
    /// - `DATABASE_URL`
    /// - `ALLOW_ANON` (`"true"`, any case)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("CODEWEAVER_API_KEY").or_else(|| lookup("HF_TOKEN")) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = lookup("CODEWEAVER_MODEL") {
            self.model.model = model;
        }
        if let Some(url) = lookup("CODEWEAVER_ENDPOINT") {
            self.model.endpoint_url = url;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(flag) = lookup("ALLOW_ANON") {
            self.auth.allow_anonymous = flag.eq_ignore_ascii_case("true");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codeweaver")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.model;
        if !(0.0..=2.0).contains(&m.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if m.initial_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "model.initial_max_tokens must be > 0".into(),
            ));
        }

        if m.max_cap_tokens < m.initial_max_tokens {
            return Err(ConfigError::ValidationError(
                "model.max_cap_tokens must be >= model.initial_max_tokens".into(),
            ));
        }

        if !m.default_load_wait_secs.is_finite() || m.default_load_wait_secs < 0.0 {
            return Err(ConfigError::ValidationError(
                "model.default_load_wait_secs must be a non-negative number".into(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "storage.max_connections must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether an endpoint API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
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
