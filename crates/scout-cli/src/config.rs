use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use scout_tools::LookupLimits;

/// Configuration loaded from `~/.config/scout/config.toml`.
///
/// The file is optional; every field has a usable default except the API
/// key, which may instead come from the `GROQ_API_KEY` environment
/// variable (the environment wins when both are set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Groq API key. `GROQ_API_KEY` overrides this.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model passed on every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Base URL override for the API.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub lookup: LookupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            base_url: None,
            lookup: LookupConfig::default(),
        }
    }
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

/// Result limits for the arXiv and Wikipedia lookup tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_top_k() -> usize {
    3
}

fn default_max_chars() -> usize {
    500
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_chars: default_max_chars(),
        }
    }
}

impl LookupConfig {
    pub fn to_limits(&self) -> LookupLimits {
        LookupLimits {
            top_k: self.top_k,
            max_chars: self.max_chars,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("scout").join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("scout"))
    }

    /// Resolve the API key: environment first, then the config file.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        anyhow::bail!(
            "No Groq API key found. Either:\n\n  \
             export GROQ_API_KEY=\"gsk_...\"\n\n\
             or add it to ~/.config/scout/config.toml:\n\n  \
             api_key = \"gsk_...\"\n\n\
             Get a key at https://console.groq.com/keys"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            api_key = "gsk-test"
            model = "llama-3.3-70b-versatile"
            temperature = 0.5

            [lookup]
            top_k = 5
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.lookup.top_k, 5);
        assert_eq!(config.lookup.max_chars, 500);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.temperature, 0.1);
        assert!(config.api_key.is_none());
        assert!(config.base_url.is_none());
        assert_eq!(config.lookup.top_k, 3);
        assert_eq!(config.lookup.max_chars, 500);
    }
}
