//! Application configuration
//!
//! Values are read from the process environment (after `dotenvy` has loaded
//! any `.env` file) and parsed into typed structs. Every field has a default
//! so an empty environment yields a runnable, memory-only service.

use std::{net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

use crate::llm::core::config::GenerationConfig;
use crate::partition::PartitionLimits;
use crate::pipeline::retry::RetryPolicy;
use crate::store::connection::StoreConfig;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Top-level configuration for the service binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub provider: ProviderConfig,
    /// Durable artifact store; `None` runs memory-only
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
        }
    }
}

/// Tunables for the generation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Maximum simultaneous provider calls across the whole process
    pub concurrency_limit: usize,
    /// Upper bound on a single provider call
    pub unit_timeout: Duration,
    pub retry: RetryPolicy,
    pub limits: PartitionLimits,
    /// How long a terminal operation stays readable
    pub retention: Duration,
    /// Reaper period for evicting expired operations
    pub sweep_interval: Duration,
    pub generation: GenerationConfig,
    /// Artifacts kept in memory when the durable store is unavailable
    pub memory_cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 8,
            unit_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            limits: PartitionLimits::default(),
            retention: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
            generation: GenerationConfig::default().with_json_mode(true),
            memory_cache_capacity: 256,
        }
    }
}

impl PipelineConfig {
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_limits(mut self, limits: PartitionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_memory_cache_capacity(mut self, capacity: usize) -> Self {
        self.memory_cache_capacity = capacity;
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("GENERATION_CONCURRENCY_LIMIT", self.concurrency_limit),
            ("GENERATION_MAX_UNITS", self.limits.max_units),
            ("GENERATION_MAX_ITEMS", self.limits.max_items),
            ("GENERATION_ITEMS_PER_UNIT", self.limits.items_per_unit),
            ("GENERATION_FRAGMENT_CHARS", self.limits.fragment_chars),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.unit_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "GENERATION_UNIT_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigError::InvalidValue {
                key: "GENERATION_RETRY_BASE_MS".to_string(),
                value: self.retry.base_delay.as_millis().to_string(),
                reason: "must not exceed GENERATION_RETRY_MAX_MS".to_string(),
            });
        }
        Ok(())
    }
}

/// Connection settings for the OpenAI-compatible provider
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let server = ServerConfig {
            bind_addr: parse_or(&get, "BIND_ADDR", ServerConfig::default().bind_addr)?,
        };

        let defaults = PipelineConfig::default();
        let concurrency_limit = match get("GENERATION_CONCURRENCY_LIMIT") {
            Some(value) => parse_value("GENERATION_CONCURRENCY_LIMIT", &value)?,
            None => parse_or(&get, "OPENAI_CONCURRENCY_LIMIT", defaults.concurrency_limit)?,
        };

        let retry = RetryPolicy::new(
            parse_or(&get, "GENERATION_RETRY_BUDGET", defaults.retry.budget)?,
            Duration::from_millis(parse_or(
                &get,
                "GENERATION_RETRY_BASE_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            Duration::from_millis(parse_or(
                &get,
                "GENERATION_RETRY_MAX_MS",
                defaults.retry.max_delay.as_millis() as u64,
            )?),
        );

        let limits = PartitionLimits {
            max_units: parse_or(&get, "GENERATION_MAX_UNITS", defaults.limits.max_units)?,
            max_items: parse_or(&get, "GENERATION_MAX_ITEMS", defaults.limits.max_items)?,
            items_per_unit: parse_or(
                &get,
                "GENERATION_ITEMS_PER_UNIT",
                defaults.limits.items_per_unit,
            )?,
            fragment_chars: parse_or(
                &get,
                "GENERATION_FRAGMENT_CHARS",
                defaults.limits.fragment_chars,
            )?,
            min_fragment_chars: parse_or(
                &get,
                "GENERATION_MIN_FRAGMENT_CHARS",
                defaults.limits.min_fragment_chars,
            )?,
        };

        let pipeline = PipelineConfig {
            concurrency_limit,
            unit_timeout: Duration::from_secs(parse_or(
                &get,
                "GENERATION_UNIT_TIMEOUT_SECS",
                defaults.unit_timeout.as_secs(),
            )?),
            retry,
            limits,
            retention: Duration::from_secs(parse_or(
                &get,
                "PROGRESS_RETENTION_SECS",
                defaults.retention.as_secs(),
            )?),
            sweep_interval: Duration::from_secs(parse_or(
                &get,
                "PROGRESS_SWEEP_SECS",
                defaults.sweep_interval.as_secs(),
            )?)
            .max(Duration::from_secs(1)),
            generation: defaults.generation.clone(),
            memory_cache_capacity: parse_or(
                &get,
                "GENERATION_MEMORY_CACHE_CAPACITY",
                defaults.memory_cache_capacity,
            )?,
        };
        pipeline.validate()?;

        let provider_defaults = ProviderConfig::default();
        let provider = ProviderConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(provider_defaults.base_url),
            model: get("OPENAI_DEFAULT_MODEL").unwrap_or(provider_defaults.model),
        };

        let store = match get("DATABASE_URL") {
            Some(url) => {
                let mut store = StoreConfig::from_connection_string(&url).map_err(|e| {
                    ConfigError::InvalidValue {
                        key: "DATABASE_URL".to_string(),
                        value: "<redacted>".to_string(),
                        reason: e.to_string(),
                    }
                })?;
                if let Some(schema) = get("DATABASE_SCHEMA") {
                    store.schema_name = schema;
                }
                store.max_pool_size = parse_or(&get, "DATABASE_POOL_SIZE", store.max_pool_size)?;
                Some(store)
            }
            None => None,
        };

        Ok(Self {
            server,
            pipeline,
            provider,
            store,
        })
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert!(!config.provider.is_configured());
        assert!(config.store.is_none());
    }

    #[test]
    fn test_concurrency_alias() {
        let config =
            AppConfig::from_lookup(lookup(&[("OPENAI_CONCURRENCY_LIMIT", "3")])).unwrap();
        assert_eq!(config.pipeline.concurrency_limit, 3);

        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_CONCURRENCY_LIMIT", "3"),
            ("GENERATION_CONCURRENCY_LIMIT", "5"),
        ]))
        .unwrap();
        assert_eq!(config.pipeline.concurrency_limit, 5);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("GENERATION_CONCURRENCY_LIMIT", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("GENERATION_CONCURRENCY_LIMIT"));
    }

    #[test]
    fn test_max_items_setting() {
        let config = AppConfig::from_lookup(lookup(&[("GENERATION_MAX_ITEMS", "30")])).unwrap();
        assert_eq!(config.pipeline.limits.max_items, 30);

        let err = AppConfig::from_lookup(lookup(&[("GENERATION_MAX_ITEMS", "0")])).unwrap_err();
        assert!(err.to_string().contains("GENERATION_MAX_ITEMS"));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err =
            AppConfig::from_lookup(lookup(&[("GENERATION_RETRY_BUDGET", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "GENERATION_RETRY_BUDGET"));
    }

    #[test]
    fn test_provider_and_store_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-secret"),
            ("OPENAI_DEFAULT_MODEL", "gpt-4o"),
            ("DATABASE_URL", "postgresql://postgres:pw@db:5433/message_store"),
            ("DATABASE_SCHEMA", "custom"),
            ("DATABASE_POOL_SIZE", "4"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ]))
        .unwrap();

        assert!(config.provider.is_configured());
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.server.bind_addr.port(), 8080);

        let store = config.store.unwrap();
        assert_eq!(store.schema_name, "custom");
        assert_eq!(store.max_pool_size, 4);
    }

    #[test]
    fn test_provider_debug_redacts_key() {
        let config = ProviderConfig::default().with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap();
        assert!(!config.provider.is_configured());
    }
}
