//! Environment configuration

use crate::agent::AgentConfig;
use std::str::FromStr;
use std::time::Duration;
use trialscout_error::{Error, Result};
use trialscout_llm::{ProviderConfig, TavilyConfig, OPENROUTER_BASE_URL};

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Runtime settings, read from the process environment at startup.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Model provider key. Absent keys surface on the first agent call.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub tavily_api_key: Option<String>,
    pub batch_size: usize,
    pub delay_secs: u64,
    pub history_window: usize,
    pub max_steps: usize,
    pub search_results: usize,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            tavily_api_key: None,
            batch_size: 3,
            delay_secs: 5,
            history_window: 6,
            max_steps: 25,
            search_results: 3,
        }
    }
}

impl ScoutConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            api_key: get("OPENROUTER_API_KEY"),
            base_url: get("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
            model: get("TRIALSCOUT_MODEL").unwrap_or(defaults.model),
            tavily_api_key: get("TAVILY_API_KEY"),
            batch_size: parse_var(&get, "TRIALSCOUT_BATCH_SIZE", defaults.batch_size)?,
            delay_secs: parse_var(&get, "TRIALSCOUT_DELAY_SECS", defaults.delay_secs)?,
            history_window: parse_var(&get, "TRIALSCOUT_HISTORY_WINDOW", defaults.history_window)?,
            max_steps: parse_var(&get, "TRIALSCOUT_MAX_STEPS", defaults.max_steps)?,
            search_results: parse_var(&get, "TRIALSCOUT_SEARCH_RESULTS", defaults.search_results)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config_invalid("TRIALSCOUT_BATCH_SIZE", "must be at least 1"));
        }
        if self.max_steps == 0 {
            return Err(Error::config_invalid("TRIALSCOUT_MAX_STEPS", "must be at least 1"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::openrouter(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_model(self.model.clone())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: Some(self.model.clone()),
            history_window: self.history_window,
            max_steps: self.max_steps,
            temperature: None,
        }
    }

    pub fn tavily_config(&self) -> TavilyConfig {
        TavilyConfig {
            api_key: self.tavily_api_key.clone(),
            max_results: self.search_results,
            ..TavilyConfig::default()
        }
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| Error::config_invalid(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use trialscout_error::ErrorKind;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScoutConfig::from_lookup(lookup(&[])).unwrap();

        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.delay(), Duration::from_secs(5));
        assert_eq!(config.history_window, 6);
        assert_eq!(config.agent_config().max_steps, 25);
        assert_eq!(config.agent_config().model.as_deref(), Some("openai/gpt-4o-mini"));
    }

    #[test]
    fn test_overrides() {
        let config = ScoutConfig::from_lookup(lookup(&[
            ("OPENROUTER_API_KEY", "sk-or-1"),
            ("TRIALSCOUT_MODEL", "openai/gpt-4o"),
            ("TRIALSCOUT_BATCH_SIZE", " 5 "),
            ("TRIALSCOUT_DELAY_SECS", "30"),
            ("TAVILY_API_KEY", ""),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-or-1"));
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.delay_secs, 30);
        assert!(config.tavily_api_key.is_none());

        let provider = config.provider_config();
        assert_eq!(provider.default_model.as_deref(), Some("openai/gpt-4o"));
        assert_eq!(config.tavily_config().max_results, 3);
    }

    #[test]
    fn test_invalid_number() {
        let err = ScoutConfig::from_lookup(lookup(&[("TRIALSCOUT_DELAY_SECS", "soon")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("key"), Some("TRIALSCOUT_DELAY_SECS"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = ScoutConfig::from_lookup(lookup(&[("TRIALSCOUT_BATCH_SIZE", "0")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
