//! Discovery orchestrator.
//!
//! Coordinates catalog sources, enforces cache policy, and presents one
//! uniform interface to callers. The orchestrator owns the decision of when
//! to refresh; sources own nothing but the network call; the cache owns the
//! storage. Source failures never escape as faults; every call produces a
//! [`DiscoveryResult`], falling back to expired data when that is all there
//! is.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    cache::CatalogCache,
    catalog::{DiscoveryResult, Freshness, ModelRecord, Provider, ProviderCatalog},
    config::{CapabilityPolicy, ConfigError, DiscoveryConfig},
    providers::{self, Credential, ModelSource, error::DiscoveryError, retry::with_retry},
};

/// Requirements used to filter catalog entries into a recommendation.
#[derive(Debug, Clone, Default)]
pub struct ModelRequirements {
    /// Minimum acceptable context window, in tokens.
    pub min_context_window: Option<i64>,

    /// Only include models known to support image inputs.
    pub require_vision: bool,

    /// Only include models known to support tool/function calling.
    pub require_functions: bool,

    /// Maximum acceptable input cost in dollars per 1k tokens.
    pub max_input_cost_per_1k: Option<f64>,
}

/// The model discovery service.
///
/// Holds the capability cache and one catalog source per provider. Construct
/// one per application (or per test; state is entirely instance-local, there
/// are no process-wide globals).
pub struct ModelDiscovery {
    config: DiscoveryConfig,
    http: reqwest::Client,
    cache: CatalogCache,
    sources: HashMap<Provider, Arc<dyn ModelSource>>,
}

impl ModelDiscovery {
    /// Build a service with the default catalog sources.
    pub fn new(config: DiscoveryConfig) -> Result<Self, ConfigError> {
        let sources = Provider::ALL
            .into_iter()
            .map(|p| (p, providers::source_for(p, config.provider(p))))
            .collect();
        Self::with_sources(config, sources)
    }

    /// Build a service with explicit catalog sources. Useful for injecting
    /// custom or scripted sources.
    pub fn with_sources(
        config: DiscoveryConfig,
        sources: HashMap<Provider, Arc<dyn ModelSource>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            http: reqwest::Client::new(),
            cache: CatalogCache::new(),
            sources,
        })
    }

    /// The underlying catalog cache, e.g. for snapshot export/import.
    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Get the models for a provider.
    ///
    /// Serves a non-expired cached catalog without touching the network
    /// unless `force_refresh` is set. On a miss or expiry the provider is
    /// fetched (with retries for transient failures, bounded by the
    /// provider's timeout); on fetch failure an expired catalog is served as
    /// a stale fallback when one exists. Expired-but-present data beats no
    /// data.
    #[tracing::instrument(skip(self, credential), fields(provider = %provider))]
    pub async fn get_models(
        &self,
        provider: Provider,
        credential: &Credential,
        force_refresh: bool,
    ) -> DiscoveryResult {
        if !force_refresh {
            if let Some(catalog) = self.cache.get(provider) {
                if !catalog.is_expired(Utc::now()) {
                    debug!(models = catalog.models.len(), "catalog cache hit");
                    return DiscoveryResult {
                        provider,
                        models: catalog.models,
                        source: Freshness::Cached,
                        error: None,
                    };
                }
            }
        }

        match self.refresh(provider, credential).await {
            Ok(catalog) => DiscoveryResult {
                provider,
                models: catalog.models,
                source: Freshness::Fresh,
                error: None,
            },
            Err(error) => {
                if let Some(previous) = self.cache.get(provider) {
                    // Do not delete the entry; expired data is still the
                    // best answer we have.
                    self.cache.mark_stale(provider);
                    warn!(
                        error = %error,
                        models = previous.models.len(),
                        "refresh failed, serving stale catalog"
                    );
                    DiscoveryResult {
                        provider,
                        models: previous.models,
                        source: Freshness::StaleFallback,
                        error: Some(error),
                    }
                } else {
                    warn!(error = %error, "refresh failed with no cached catalog");
                    DiscoveryResult {
                        provider,
                        models: Vec::new(),
                        source: Freshness::Fresh,
                        error: Some(error),
                    }
                }
            }
        }
    }

    /// Fetch a provider's catalog and store it.
    async fn refresh(
        &self,
        provider: Provider,
        credential: &Credential,
    ) -> Result<ProviderCatalog, DiscoveryError> {
        let source = self
            .sources
            .get(&provider)
            .ok_or_else(|| DiscoveryError::Transport {
                provider,
                message: "no catalog source registered for provider".to_string(),
            })?;

        let settings = self.config.provider(provider);
        let timeout = settings.timeout();

        // One timeout bounds the whole fetch, retries included; in-flight
        // calls are dropped when it fires.
        let fetch = with_retry(&self.config.retry, provider, "list_models", || {
            source.list_models(&self.http, credential)
        });
        let scan = match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DiscoveryError::Transport {
                    provider,
                    message: format!("discovery timed out after {timeout:?}"),
                });
            }
        };

        if scan.failed_probes > 0 {
            debug!(failed_probes = scan.failed_probes, "scan had partial failures");
        }

        let mut models = scan.models;
        if self.config.capability_policy == CapabilityPolicy::AssumeAbsent {
            for model in &mut models {
                model.supports_functions.get_or_insert(false);
                model.supports_vision.get_or_insert(false);
                model.supports_json_mode.get_or_insert(false);
            }
        }

        let catalog =
            ProviderCatalog::new(provider, models, Utc::now(), self.config.cache_ttl());
        self.cache.put(catalog.clone());

        info!(models = catalog.models.len(), "refreshed provider catalog");
        Ok(catalog)
    }

    /// Discover models for every provider a credential was supplied for,
    /// concurrently.
    ///
    /// One task per provider, joined before returning; a failure for one
    /// provider never affects the others' results or timing. The returned
    /// map always has exactly one entry per requested provider.
    pub async fn discover_all(
        &self,
        credentials: &HashMap<Provider, Credential>,
    ) -> HashMap<Provider, DiscoveryResult> {
        let tasks = credentials.iter().map(|(provider, credential)| {
            let provider = *provider;
            async move { (provider, self.get_models(provider, credential, false).await) }
        });

        futures::future::join_all(tasks).await.into_iter().collect()
    }

    /// Look up one model's record in the current catalog.
    ///
    /// Reads whatever is cached, possibly stale, and never triggers
    /// network I/O. Fails with [`DiscoveryError::NotFound`] when the model
    /// (or the whole provider) has no record.
    pub fn get_capabilities(
        &self,
        provider: Provider,
        model_id: &str,
    ) -> Result<ModelRecord, DiscoveryError> {
        self.cache
            .get(provider)
            .and_then(|catalog| catalog.find(model_id).cloned())
            .ok_or_else(|| DiscoveryError::NotFound {
                provider,
                model_id: model_id.to_string(),
            })
    }

    /// Drop the cached catalog for one provider, or all of them.
    ///
    /// The next `get_models` call for an affected provider performs a real
    /// fetch.
    pub fn invalidate(&self, provider: Option<Provider>) {
        match provider {
            Some(p) => {
                self.cache.invalidate(p);
                info!(provider = %p, "invalidated cached catalog");
            }
            None => {
                self.cache.clear();
                info!("invalidated all cached catalogs");
            }
        }
    }

    /// Recommend cached models matching the given requirements.
    ///
    /// Filters the current (possibly stale) catalog: deprecated models are
    /// skipped, and a requirement is only satisfied by a model *known* to
    /// meet it; unknown capabilities do not count. Results are ordered by
    /// context window descending, then input cost ascending.
    pub fn recommend(
        &self,
        provider: Provider,
        requirements: &ModelRequirements,
    ) -> Vec<ModelRecord> {
        let Some(catalog) = self.cache.get(provider) else {
            return Vec::new();
        };

        let mut matches: Vec<ModelRecord> = catalog
            .models
            .into_iter()
            .filter(|m| !m.deprecated)
            .filter(|m| {
                if let Some(min) = requirements.min_context_window {
                    if m.context_window.map_or(true, |cw| cw < min) {
                        return false;
                    }
                }
                if requirements.require_vision && m.supports_vision != Some(true) {
                    return false;
                }
                if requirements.require_functions && m.supports_functions != Some(true) {
                    return false;
                }
                if let Some(max_cost) = requirements.max_input_cost_per_1k {
                    if m.pricing.map_or(false, |p| p.input_per_1k > max_cost) {
                        return false;
                    }
                }
                true
            })
            .collect();

        matches.sort_by(|a, b| {
            b.context_window
                .unwrap_or(0)
                .cmp(&a.context_window.unwrap_or(0))
                .then_with(|| {
                    let cost_a = a.pricing.map(|p| p.input_per_1k).unwrap_or(0.0);
                    let cost_b = b.pricing.map(|p| p.input_per_1k).unwrap_or(0.0);
                    cost_a.partial_cmp(&cost_b).unwrap_or(Ordering::Equal)
                })
        });

        matches
    }
}

impl std::fmt::Debug for ModelDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDiscovery")
            .field("cache", &self.cache)
            .field("providers", &self.sources.len())
            .finish()
    }
}
