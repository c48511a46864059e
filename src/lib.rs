//! # Pantheon
//!
//! Dynamic model discovery and capability caching for multi-provider LLM
//! applications.
//!
//! Pantheon answers one question: which models can this credential use
//! right now, and what can they do? Providers disagree wildly about how to
//! answer it. OpenAI-style APIs expose a flat list endpoint,
//! Gemini nests models in a structured catalog, and Anthropic has no
//! enumeration endpoint at all, so availability has to be probed. Each
//! answer is normalized into one record shape and cached with an explicit
//! TTL.
//!
//! When a provider is unreachable, the last known catalog is served past its
//! expiry and flagged as stale: expired data beats no data, and a failure at
//! one provider never affects discovery at the others.
//!
//! ```no_run
//! use pantheon::{Credential, DiscoveryConfig, ModelDiscovery, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let discovery = ModelDiscovery::new(DiscoveryConfig::default())?;
//!
//! let result = discovery
//!     .get_models(Provider::OpenAi, &Credential::new("sk-..."), false)
//!     .await;
//! for model in &result.models {
//!     println!("{} (context: {:?})", model.id, model.context_window);
//! }
//!
//! // Later: parameter limits for a chosen model, straight from the cache.
//! let record = discovery.get_capabilities(Provider::OpenAi, "gpt-4o")?;
//! println!("max output tokens: {:?}", record.max_output_tokens);
//! # Ok(())
//! # }
//! ```
//!
//! Credentials are passed through per call and never persisted. The service
//! holds no process-wide state; construct one instance per application (or
//! per test) and drop it when done.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod providers;

#[cfg(test)]
mod tests;

pub use cache::{CacheSnapshot, CatalogCache};
pub use catalog::{
    DiscoveryResult, Freshness, ModelPricing, ModelRecord, Provider, ProviderCatalog,
};
pub use config::{
    CapabilityPolicy, ConfigError, DiscoveryConfig, ProviderSettings, RetryConfig,
};
pub use discovery::{ModelDiscovery, ModelRequirements};
pub use providers::{Credential, ModelScan, ModelSource, error::DiscoveryError};
