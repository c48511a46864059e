//! Core types for the model discovery catalog.
//!
//! Every provider's wire format is normalized into [`ModelRecord`], so callers
//! see the same field set regardless of where a model was discovered.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::error::DiscoveryError;

/// Upstream model-catalog sources, one variant per provider family.
///
/// The set is closed on purpose: adapter behavior is selected by matching this
/// enum once, not by string comparisons scattered through callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI-style list endpoint (`GET /models` returns a flat list).
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic: no enumeration endpoint, availability is probed.
    Anthropic,
    /// Google Gemini: structured catalog endpoint with nested models.
    Gemini,
}

impl Provider {
    /// All supported providers, in discovery order.
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Gemini];

    /// Stable identifier used in logs and serialized data.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing in dollars per 1k tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Input token cost ($/1k tokens)
    pub input_per_1k: f64,

    /// Output token cost ($/1k tokens)
    pub output_per_1k: f64,
}

/// Normalized description of one discoverable model.
///
/// Records are immutable once constructed: a refresh produces new records, it
/// never edits the ones already cached. `(provider, id)` is unique within a
/// catalog.
///
/// Capability fields are `Option<bool>` because most catalog endpoints simply
/// omit them; `None` means "not advertised", not "unsupported". See
/// [`CapabilityPolicy`](crate::config::CapabilityPolicy) for coercing unknowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Provider this model belongs to.
    pub provider: Provider,

    /// Provider-native model identifier (e.g., "gpt-4o").
    pub id: String,

    /// Human-readable model name, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Short description, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Maximum context window size (tokens).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<i64>,

    /// Maximum output tokens per request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i64>,

    /// Whether the model supports tool/function calling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_functions: Option<bool>,

    /// Whether the model supports image inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_vision: Option<bool>,

    /// Whether the model supports structured JSON output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_json_mode: Option<bool>,

    /// Pricing, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,

    /// Whether the provider has marked the model deprecated.
    #[serde(default)]
    pub deprecated: bool,

    /// When this record was produced from a provider response.
    pub discovered_at: DateTime<Utc>,
}

impl ModelRecord {
    /// A record with nothing but identity; adapters fill in what the provider
    /// actually advertises.
    pub fn new(provider: Provider, id: impl Into<String>, discovered_at: DateTime<Utc>) -> Self {
        Self {
            provider,
            id: id.into(),
            display_name: None,
            description: None,
            context_window: None,
            max_output_tokens: None,
            supports_functions: None,
            supports_vision: None,
            supports_json_mode: None,
            pricing: None,
            deprecated: false,
            discovered_at,
        }
    }
}

/// Cache entry holding one provider's last known model list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCatalog {
    /// Provider these models belong to.
    pub provider: Provider,

    /// Models discovered in the last successful fetch.
    pub models: Vec<ModelRecord>,

    /// When the catalog was stored.
    pub cached_at: DateTime<Utc>,

    /// When the catalog stops being fresh. Always after `cached_at`.
    pub expires_at: DateTime<Utc>,

    /// Set once a refresh attempt failed while this entry was expired and it
    /// is being served past its expiry.
    #[serde(default)]
    pub is_stale: bool,
}

impl ProviderCatalog {
    /// Build a catalog entry valid for `ttl` from `cached_at`.
    pub fn new(
        provider: Provider,
        models: Vec<ModelRecord>,
        cached_at: DateTime<Utc>,
        ttl: std::time::Duration,
    ) -> Self {
        // Clamp to at least one second so expires_at > cached_at always holds.
        let ttl_secs = ttl.as_secs().max(1) as i64;
        Self {
            provider,
            models,
            cached_at,
            expires_at: cached_at + ChronoDuration::seconds(ttl_secs),
            is_stale: false,
        }
    }

    /// Whether the entry is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Look up a model by id.
    pub fn find(&self, model_id: &str) -> Option<&ModelRecord> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

/// Where the models in a [`DiscoveryResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Freshness {
    /// Fetched from the provider during this call.
    Fresh,
    /// Served from a non-expired cache entry; no network call was made.
    Cached,
    /// The refresh failed; these are expired models served as a fallback.
    StaleFallback,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fresh => "fresh",
            Self::Cached => "cached",
            Self::StaleFallback => "stale-fallback",
        };
        f.write_str(s)
    }
}

/// Uniform result returned to callers for every discovery request.
///
/// Always produced, even on total failure, so UI layers can render "no models
/// available, last known error: ..." instead of crashing. `error` is present
/// when the result is a stale fallback or when the fetch failed with no prior
/// catalog to fall back on (in which case `models` is empty and `source` is
/// [`Freshness::Fresh`]).
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    /// Provider this result describes.
    pub provider: Provider,

    /// Models known for the provider; empty on total failure.
    pub models: Vec<ModelRecord>,

    /// Where the models came from.
    pub source: Freshness,

    /// The failure behind a stale fallback or an empty result.
    pub error: Option<DiscoveryError>,
}

impl DiscoveryResult {
    /// Whether the result reflects a successful fetch or a valid cache hit.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
