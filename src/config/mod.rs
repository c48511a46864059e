//! Configuration for the discovery service.
//!
//! Everything tunable is here: cache TTL, per-provider timeouts, the retry
//! policy, and the probe allow-list for providers without an enumeration
//! endpoint. All fields have documented defaults so an empty config works.
//!
//! # Example
//!
//! ```toml
//! cache_ttl_secs = 1800
//! capability_policy = "unknown"
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 250
//!
//! [anthropic]
//! timeout_secs = 20
//! probe_models = ["claude-3-5-sonnet-20241022", "claude-3-haiku-20240307"]
//!
//! [openai]
//! base_url = "https://api.openai.com/v1"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Provider;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// How to treat capability fields a provider does not advertise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityPolicy {
    /// Keep unadvertised capabilities as `None`. Silence is not proof of
    /// absence.
    #[default]
    Unknown,

    /// Coerce unadvertised capabilities to `Some(false)`, for callers that
    /// want hard booleans.
    AssumeAbsent,
}

/// Retry policy for transient discovery failures.
///
/// Only rate-limit and transport failures are retried; a rejected credential
/// or an unparseable response fails immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whether retries are enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of retry attempts (not including the initial request).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Random jitter applied to delays (fraction, 0.0-1.0).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given retry attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            (self.initial_delay_ms as f64) * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let jitter_range = capped_delay * self.jitter;
        let jitter = if jitter_range > 0.0 {
            use rand::Rng;
            rand::thread_rng().gen_range(-jitter_range..jitter_range)
        } else {
            0.0
        };

        let final_delay = (capped_delay + jitter).max(0.0);
        Duration::from_millis(final_delay as u64)
    }

    fn validate(&self) -> Result<(), String> {
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(format!("jitter must be within 0.0-1.0, got {}", self.jitter));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(format!(
                "max_delay_ms ({}) must be >= initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            ));
        }
        Ok(())
    }
}

/// Settings for one provider's catalog source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Override the provider's API base URL (e.g., for a compatible proxy or
    /// a test server). The source's default is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bound on one whole discovery fetch, retries included, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bound on a single availability probe, in seconds. Only meaningful for
    /// trial-and-error sources.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Model identifiers to probe for providers without an enumeration
    /// endpoint. Empty means the source's built-in allow-list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probe_models: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            probe_models: Vec::new(),
        }
    }
}

impl ProviderSettings {
    /// Whole-fetch timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Per-probe timeout as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }
        if self.probe_timeout_secs == 0 {
            return Err("probe_timeout_secs must be > 0".to_string());
        }
        if let Some(url) = &self.base_url {
            url::Url::parse(url).map_err(|e| format!("base_url '{url}' is not a valid URL: {e}"))?;
        }
        Ok(())
    }
}

/// Root configuration for the discovery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// How long a fetched catalog stays fresh, in seconds. Default: one hour.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// How to treat capability fields providers do not advertise.
    #[serde(default)]
    pub capability_policy: CapabilityPolicy,

    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// OpenAI source settings.
    #[serde(default)]
    pub openai: ProviderSettings,

    /// Anthropic source settings.
    #[serde(default)]
    pub anthropic: ProviderSettings,

    /// Gemini source settings.
    #[serde(default)]
    pub gemini: ProviderSettings,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            capability_policy: CapabilityPolicy::default(),
            retry: RetryConfig::default(),
            openai: ProviderSettings::default(),
            anthropic: ProviderSettings::default(),
            gemini: ProviderSettings::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Catalog TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Settings for one provider.
    pub fn provider(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Gemini => &self.gemini,
        }
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl().is_zero() {
            return Err(ConfigError::Validation(
                "cache_ttl_secs must be > 0".to_string(),
            ));
        }

        self.retry
            .validate()
            .map_err(|e| ConfigError::Validation(format!("retry: {e}")))?;

        for provider in Provider::ALL {
            self.provider(provider)
                .validate()
                .map_err(|e| ConfigError::Validation(format!("provider '{provider}': {e}")))?;
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    3600
}
