//! Environment configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audit::DEFAULT_DECISION_LOG_CAPACITY;
use crate::differ::{DiffConfig, DEFAULT_MATERIALITY_USD, DEFAULT_NOTIONAL_USD, DEFAULT_VERIFICATION_NETWORK};
use crate::error::AgentError;
use crate::Result;

pub const DEFAULT_TOGETHER_URL: &str = "https://api.together.xyz/v1/completions";
pub const DEFAULT_TOGETHER_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Completion service
    #[serde(skip_serializing)]
    pub together_api_key: Option<String>,
    pub together_base_url: String,
    pub together_model: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,

    // Server
    pub port: u16,

    // Rebalancing
    pub notional_usd: f64,
    pub materiality_usd: f64,
    pub verification_network: String,

    // Decision log
    pub decision_log_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            together_api_key: None,
            together_base_url: DEFAULT_TOGETHER_URL.to_string(),
            together_model: DEFAULT_TOGETHER_MODEL.to_string(),
            llm_max_tokens: 800,
            llm_temperature: 0.1,
            llm_timeout_secs: 30,
            llm_max_retries: 1,
            port: 8080,
            notional_usd: DEFAULT_NOTIONAL_USD,
            materiality_usd: DEFAULT_MATERIALITY_USD,
            verification_network: DEFAULT_VERIFICATION_NETWORK.to_string(),
            decision_log_capacity: DEFAULT_DECISION_LOG_CAPACITY,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Unset means "use the default"; set but unparsable is an error.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env_string(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| AgentError::ConfigError(format!("{} has invalid value '{}'", key, raw))),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match env_string("PORT") {
            Some(_) => env_parse("PORT", defaults.port)?,
            None => env_parse("API_PORT", defaults.port)?,
        };

        let config = Self {
            together_api_key: env_string("TOGETHER_API_KEY"),
            together_base_url: env_string("TOGETHER_BASE_URL").unwrap_or(defaults.together_base_url),
            together_model: env_string("TOGETHER_MODEL").unwrap_or(defaults.together_model),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            llm_temperature: env_parse("LLM_TEMPERATURE", defaults.llm_temperature)?,
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", defaults.llm_timeout_secs)?,
            llm_max_retries: env_parse("LLM_MAX_RETRIES", defaults.llm_max_retries)?,
            port,
            notional_usd: env_parse("NOTIONAL_USD", defaults.notional_usd)?,
            materiality_usd: env_parse("MATERIALITY_USD", defaults.materiality_usd)?,
            verification_network: env_string("VERIFICATION_NETWORK")
                .unwrap_or(defaults.verification_network),
            decision_log_capacity: env_parse("DECISION_LOG_CAPACITY", defaults.decision_log_capacity)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm_timeout_secs == 0 {
            return Err(AgentError::ConfigError(
                "LLM_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.decision_log_capacity == 0 {
            return Err(AgentError::ConfigError(
                "DECISION_LOG_CAPACITY must be at least 1".to_string(),
            ));
        }
        self.diff_config().validate()
    }

    pub fn diff_config(&self) -> DiffConfig {
        DiffConfig {
            notional_usd: self.notional_usd,
            materiality_usd: self.materiality_usd,
            verification_network: self.verification_network.clone(),
        }
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.together_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.diff_config(), DiffConfig::default());
        assert_eq!(config.llm_timeout(), Duration::from_secs(30));
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.materiality_usd = -5.0;
        assert!(matches!(config.validate(), Err(AgentError::ConfigError(_))));

        let mut config = AppConfig::default();
        config.llm_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.decision_log_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_parse_falls_back_when_unset() {
        let value: u64 = env_parse("SENTIMENT_REBALANCER_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = AppConfig::default();
        config.together_api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
