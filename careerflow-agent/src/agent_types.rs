use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

const ENV_API_KEY: &str = "CAREERFLOW_API_KEY";
const ENV_BASE_URL: &str = "CAREERFLOW_BASE_URL";
const ENV_MODEL: &str = "CAREERFLOW_MODEL";
const ENV_TEMPERATURE: &str = "CAREERFLOW_TEMPERATURE";
const ENV_MAX_TOKENS: &str = "CAREERFLOW_MAX_TOKENS";

/// Agent node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Stable node identifier
    pub node_id: String,
    /// Human-readable capability summary
    pub description: String,
    /// Fixed instruction text sent ahead of every exchange
    pub system_prompt: String,
}

impl AgentConfig {
    pub fn new(node_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            description: description.into(),
            system_prompt: "You are a helpful AI assistant.".to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

/// Backend model configuration, validated once at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Credential for the text-generation service
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Endpoint override; the provider default is used when absent
    pub base_url: Option<String>,
    /// Model identifier
    pub model_name: String,
    /// Sampling parameters
    pub parameters: ModelParameters,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("parameters", &self.parameters)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model_name: "gpt-4o-mini".to_string(),
            parameters: ModelParameters::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ModelConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Read configuration from `CAREERFLOW_*` environment variables.
    ///
    /// Unset variables keep their defaults; the result is validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(key) = std::env::var(ENV_API_KEY) {
            config.api_key = Some(key);
        }
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.base_url = Some(url);
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            config.model_name = model;
        }
        if let Ok(raw) = std::env::var(ENV_TEMPERATURE) {
            config.parameters.temperature = raw.trim().parse().map_err(|_| {
                AgentError::configuration(format!("{ENV_TEMPERATURE} is not a number: {raw}"))
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_MAX_TOKENS) {
            config.parameters.max_tokens = raw.trim().parse().map_err(|_| {
                AgentError::configuration(format!("{ENV_MAX_TOKENS} is not an integer: {raw}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.parameters.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.parameters.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject configurations that can never produce a successful call.
    pub fn validate(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(AgentError::configuration("API key is required")),
        }
        if self.model_name.trim().is_empty() {
            return Err(AgentError::configuration("model name is required"));
        }
        self.parameters.validate()
    }
}

/// Model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

impl ModelParameters {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::configuration(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AgentError::configuration("max_tokens must be positive"));
        }
        Ok(())
    }
}

/// Bounded retry with linear backoff: attempt `n` waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ModelConfig {
        ModelConfig::new("gpt-4o-mini").with_api_key("sk-test")
    }

    #[test]
    fn test_agent_config_creation() {
        let config = AgentConfig::new("conversation", "General chat")
            .with_system_prompt("Be helpful");

        assert_eq!(config.node_id, "conversation");
        assert_eq!(config.system_prompt, "Be helpful");
    }

    #[test]
    fn test_model_config_validation() {
        assert!(valid_config().validate().is_ok());

        let err = ModelConfig::new("gpt-4o-mini").validate().unwrap_err();
        assert_eq!(err.category(), "configuration");

        assert!(valid_config().with_api_key("  ").validate().is_err());
        assert!(valid_config().with_temperature(2.5).validate().is_err());
        assert!(valid_config().with_temperature(-0.1).validate().is_err());
        assert!(valid_config().with_temperature(2.0).validate().is_ok());
        assert!(valid_config().with_max_tokens(0).validate().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_retry_policy_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
