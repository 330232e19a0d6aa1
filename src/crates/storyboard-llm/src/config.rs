//! Provider configuration.

use crate::error::{LlmError, Result};
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one LLM provider.
///
/// `base_url` and `model` may be left empty to use the provider's preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Base URL for the API, without the endpoint path.
    ///
    /// Examples:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - Gemini: "https://generativelanguage.googleapis.com/v1beta"
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub model: String,

    /// API key. Usually `${OPENAI_API_KEY}` in configuration files.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on completion tokens; per-call limits are capped by it.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: String::new(),
            model: String::new(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Configuration that relies on the provider's preset URL and model.
    pub fn for_provider(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    /// Create configuration with the API key taken from an environment variable.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::Config(format!("API key not found in environment variable {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured base URL, or the provider preset, without a trailing slash.
    pub fn effective_base_url(&self) -> &str {
        let configured = self.base_url.trim();
        let base = if configured.is_empty() {
            self.provider.default_base_url().unwrap_or_default()
        } else {
            configured
        };
        base.trim_end_matches('/')
    }

    pub fn effective_model(&self) -> &str {
        let configured = self.model.trim();
        if configured.is_empty() {
            self.provider.default_model()
        } else {
            configured
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is required".to_string()));
        }
        if self.effective_base_url().is_empty() {
            return Err(LlmError::Config(format!(
                "Base URL is required for provider {}",
                self.provider
            )));
        }
        Ok(())
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}
