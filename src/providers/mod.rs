//! Catalog source implementations.
//!
//! One implementation per provider family, each translating that provider's
//! model-catalog API into a sequence of [`ModelRecord`]s:
//!
//! - [`open_ai`]: a single list endpoint returning a flat array.
//! - [`gemini`]: a structured catalog endpoint with models nested under a
//!   named collection.
//! - [`anthropic`]: no enumeration endpoint at all; a static allow-list of
//!   known identifiers is probed with minimal requests.
//!
//! Sources are stateless: each call receives the shared HTTP client and the
//! caller's credential, performs its network I/O, and returns normalized
//! records or a typed [`error::DiscoveryError`]. Nothing is cached here;
//! cache policy belongs to the orchestrator.

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod open_ai;
pub mod retry;
#[cfg(test)]
pub mod test_utils;

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    catalog::{ModelRecord, Provider},
    config::ProviderSettings,
    providers::error::DiscoveryError,
};

/// An API credential passed through to a catalog source for a single call.
///
/// Credentials are never persisted by this crate: they travel from the
/// caller to the adapter and are dropped. The `Debug` impl redacts the
/// contents so a credential can't leak through logging.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for building request headers.
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(\"[redacted]\")")
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Outcome of one catalog scan against a provider.
///
/// `failed_probes` is only nonzero for trial-and-error sources, where
/// individual model probes can fail without failing the scan.
#[derive(Debug, Clone, Default)]
pub struct ModelScan {
    /// Models the provider reported (or answered probes for).
    pub models: Vec<ModelRecord>,

    /// Probes that did not succeed. Informational; the scan itself succeeded.
    pub failed_probes: usize,
}

impl ModelScan {
    pub fn from_models(models: Vec<ModelRecord>) -> Self {
        Self {
            models,
            failed_probes: 0,
        }
    }
}

/// A source of model-catalog data for one provider.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// The provider this source talks to.
    fn provider(&self) -> Provider;

    /// Fetch and normalize the provider's model list.
    ///
    /// Performs network I/O only; no shared state is touched. Fails with a
    /// typed [`DiscoveryError`] describing what went wrong.
    async fn list_models(
        &self,
        client: &reqwest::Client,
        credential: &Credential,
    ) -> Result<ModelScan, DiscoveryError>;
}

/// Build the catalog source for a provider from its settings.
pub(crate) fn source_for(provider: Provider, settings: &ProviderSettings) -> Arc<dyn ModelSource> {
    match provider {
        Provider::OpenAi => Arc::new(open_ai::OpenAiCatalogSource::new(settings)),
        Provider::Anthropic => Arc::new(anthropic::AnthropicCatalogSource::new(settings)),
        Provider::Gemini => Arc::new(gemini::GeminiCatalogSource::new(settings)),
    }
}
