//! Configuration types for the transport chain.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Status codes returned by synthetic flaky responses.
pub const DEFAULT_FLAKY_STATUS_CODES: [u16; 6] = [401, 403, 404, 408, 500, 503];

/// Main configuration for the chain.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Global settings.
    pub settings: Settings,
    /// Authentication key injection; disabled when absent.
    pub key: Option<KeyConfig>,
    /// Request/response logging.
    pub logging: LoggingConfig,
    /// Flaky upstream simulation.
    pub flaky: FlakyConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.settings.timeout_ms == 0 {
            return Err(anyhow!("settings.timeout_ms must be > 0"));
        }

        if let Some(key) = &self.key {
            key.validate()?;
        }

        self.flaky.validate()?;

        Ok(())
    }
}

/// Global settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout for a whole request on the real transport.
    pub timeout_ms: u64,
    /// User agent sent by the real transport.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agent: format!("zentinel-transport/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authentication key appended to every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyConfig {
    /// The key itself.
    pub value: String,
    /// Query parameter name.
    #[serde(default = "default_key_param")]
    pub param: String,
}

fn default_key_param() -> String {
    crate::key::DEFAULT_KEY_PARAM.to_string()
}

impl KeyConfig {
    /// Validate the key configuration.
    pub fn validate(&self) -> Result<()> {
        if self.value.is_empty() {
            return Err(anyhow!("key.value cannot be empty"));
        }
        if self.param.is_empty() {
            return Err(anyhow!("key.param cannot be empty"));
        }
        if self
            .param
            .chars()
            .any(|c| matches!(c, '&' | '=' | '#' | '?') || c.is_whitespace())
        {
            return Err(anyhow!("Invalid key parameter name: {}", self.param));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log every exchange.
    pub enabled: bool,
    /// Extra query parameters whose values are redacted.
    pub redact_params: Vec<String>,
    /// Extra headers whose values are redacted.
    pub redact_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_params: Vec::new(),
            redact_headers: Vec::new(),
        }
    }
}

/// Flaky upstream simulation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlakyConfig {
    /// Whether the flaky layer is installed at all.
    pub enabled: bool,
    /// Chance that a call outside a window opens a new one (0.0-1.0).
    pub probability: f64,
    /// Upper bound (exclusive) of a window's length.
    pub max_window_ms: u64,
    /// Status codes for synthetic responses, picked uniformly.
    pub status_codes: Vec<u16>,
    /// Body of synthetic responses.
    pub body: String,
    /// Fixed seed for a reproducible run; wall clock when unset.
    pub seed: Option<u64>,
}

impl Default for FlakyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: 0.03,
            max_window_ms: 90_000,
            status_codes: DEFAULT_FLAKY_STATUS_CODES.to_vec(),
            body: "flaky error body".to_string(),
            seed: None,
        }
    }
}

impl FlakyConfig {
    /// Validate the flaky configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(anyhow!(
                "flaky.probability must be between 0.0 and 1.0, got {}",
                self.probability
            ));
        }

        if self.max_window_ms == 0 {
            return Err(anyhow!("flaky.max_window_ms must be > 0"));
        }

        if self.status_codes.is_empty() {
            return Err(anyhow!("flaky.status_codes cannot be empty"));
        }

        for status in &self.status_codes {
            if *status < 100 || *status > 599 {
                return Err(anyhow!("Invalid HTTP status code: {}", status));
            }
        }

        Ok(())
    }
}
