// src/config.rs
use std::{
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
    time::Duration,
};

use thiserror::Error;

use crate::services::{
    generator::{GenerationConfig, GenerationError},
    hf_model::HttpModelConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid listen address: {0}")]
    Address(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model: HttpModelConfig,
    pub generation: GenerationConfig,
    pub persist_turns: bool,
}

impl AppConfig {
    /// Reads the process environment (after `.env`, if any, was loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GenerationConfig::default();

        let mut model = HttpModelConfig::new(
            lookup("INFERENCE_BASE_URL")
                .unwrap_or_else(|| "https://api-inference.huggingface.co".to_string()),
            lookup("MODEL_ID").unwrap_or_else(|| "gpt2".to_string()),
        );
        if let Some(token) = lookup("HF_API_TOKEN").filter(|t| !t.is_empty()) {
            model = model.with_api_token(token);
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "INFERENCE_TIMEOUT_SECS")? {
            model = model.with_timeout(Duration::from_secs(secs));
        }

        let generation = GenerationConfig {
            max_length: parse(&lookup, "MAX_LENGTH")?.unwrap_or(defaults.max_length),
            temperature: parse(&lookup, "TEMPERATURE")?.unwrap_or(defaults.temperature),
            top_k: parse(&lookup, "TOP_K")?.unwrap_or(defaults.top_k),
            top_p: parse(&lookup, "TOP_P")?.unwrap_or(defaults.top_p),
            num_return_sequences: defaults.num_return_sequences,
            seed: parse(&lookup, "GENERATION_SEED")?,
            return_full_text: parse(&lookup, "RETURN_FULL_TEXT")?
                .unwrap_or(defaults.return_full_text),
        };
        generation.validate()?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse(&lookup, "PORT")?.unwrap_or(11435),
            model,
            generation,
            persist_turns: parse(&lookup, "PERSIST_TURNS")?.unwrap_or(false),
        })
    }

    /// Resolves `HOST` (IP literal, bracketed IPv6 or hostname) with `PORT`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host.trim().trim_start_matches('[').trim_end_matches(']');
        let invalid = || ConfigError::Address(format!("{}:{}", self.host, self.port));
        (host, self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 11435);
        assert_eq!(config.model.model_id, "gpt2");
        assert_eq!(config.model.api_token, None);
        assert_eq!(config.model.timeout, None);
        assert_eq!(config.generation, GenerationConfig::default());
        assert!(!config.persist_turns);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("MODEL_ID", "distilgpt2"),
            ("HF_API_TOKEN", "hf_xxx"),
            ("INFERENCE_TIMEOUT_SECS", "30"),
            ("TEMPERATURE", "0.2"),
            ("TOP_K", "0"),
            ("GENERATION_SEED", "1234"),
            ("RETURN_FULL_TEXT", "false"),
            ("PERSIST_TURNS", "true"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.model.model_id, "distilgpt2");
        assert_eq!(config.model.api_token.as_deref(), Some("hf_xxx"));
        assert_eq!(config.model.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.top_k, 0);
        assert_eq!(config.generation.seed, Some(1234));
        assert!(!config.generation.return_full_text);
        assert!(config.persist_turns);
    }

    #[test]
    fn unparseable_value_names_the_key() {
        let err = config_from(&[("PORT", "eleven")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn out_of_range_generation_values_fail() {
        let err = config_from(&[("TOP_P", "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Generation(GenerationError::InvalidConfig(_))));
    }

    #[test]
    fn listen_addr_combines_host_and_port() {
        let config = config_from(&[("HOST", "0.0.0.0"), ("PORT", "3000")]).unwrap();
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn listen_addr_resolves_hostnames() {
        let config = config_from(&[("HOST", "localhost")]).unwrap();
        let addr = config.listen_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 11435);
    }

    #[test]
    fn listen_addr_accepts_ipv6_with_and_without_brackets() {
        for host in ["::1", "[::1]"] {
            let config = config_from(&[("HOST", host), ("PORT", "8080")]).unwrap();
            assert_eq!(config.listen_addr().unwrap().to_string(), "[::1]:8080");
        }
    }

    #[test]
    fn unresolvable_host_is_an_address_error() {
        let config = config_from(&[("HOST", "bad\0host")]).unwrap();
        assert!(matches!(config.listen_addr(), Err(ConfigError::Address(_))));
    }
}
