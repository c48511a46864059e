//! Time-bounded storage of provider catalogs.
//!
//! The cache is deliberately a dumb store: `get` returns entries whether or
//! not they have expired, and callers decide freshness by comparing
//! `expires_at` to the current time. Expiry and stale-fallback policy live in
//! the orchestrator, not here.
//!
//! Entries are sharded per provider key, so concurrent updates to different
//! providers never contend and a replacement for one provider is atomic with
//! respect to readers: a concurrent `get` observes either the fully-old or
//! fully-new entry, never a partial write.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{Provider, ProviderCatalog};

/// In-memory store of [`ProviderCatalog`] keyed by provider.
#[derive(Default)]
pub struct CatalogCache {
    entries: DashMap<Provider, ProviderCatalog>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get the stored catalog for a provider, expired or not.
    pub fn get(&self, provider: Provider) -> Option<ProviderCatalog> {
        self.entries.get(&provider).map(|e| e.value().clone())
    }

    /// Store a catalog, atomically replacing any existing entry.
    pub fn put(&self, catalog: ProviderCatalog) {
        self.entries.insert(catalog.provider, catalog);
    }

    /// Flag a provider's entry as served-past-expiry after a failed refresh.
    pub fn mark_stale(&self, provider: Provider) {
        if let Some(mut entry) = self.entries.get_mut(&provider) {
            entry.is_stale = true;
        }
    }

    /// Remove one provider's entry. Returns whether an entry existed.
    pub fn invalidate(&self, provider: Provider) -> bool {
        self.entries.remove(&provider).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored catalogs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the current contents for serialization.
    pub fn snapshot(&self) -> CacheSnapshot {
        let mut catalogs: Vec<ProviderCatalog> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        catalogs.sort_by_key(|c| c.provider.as_str());
        CacheSnapshot { catalogs }
    }

    /// Restore entries from a snapshot, skipping any that have already
    /// expired at `now`. Existing entries for the same providers are
    /// replaced. Returns the number of entries restored.
    pub fn restore(&self, snapshot: CacheSnapshot, now: DateTime<Utc>) -> usize {
        let mut restored = 0;
        for catalog in snapshot.catalogs {
            if catalog.is_expired(now) {
                tracing::debug!(
                    provider = %catalog.provider,
                    "skipping expired catalog during restore"
                );
                continue;
            }
            self.put(catalog);
            restored += 1;
        }
        restored
    }

    /// Serialize the cache contents to JSON.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    /// Restore entries from [`export_json`](Self::export_json) output,
    /// skipping expired ones. Returns the number of entries restored.
    pub fn import_json(&self, json: &str, now: DateTime<Utc>) -> serde_json::Result<usize> {
        let snapshot: CacheSnapshot = serde_json::from_str(json)?;
        Ok(self.restore(snapshot, now))
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("providers", &self.entries.len())
            .finish()
    }
}

/// Serializable dump of the cache contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub catalogs: Vec<ProviderCatalog>,
}
