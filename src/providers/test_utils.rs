//! Test utilities for discovery testing.
//!
//! Scripted in-memory [`ModelSource`] implementations with call accounting,
//! so orchestrator tests can assert exactly when the network would have been
//! touched without standing up a mock server.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use chrono::Utc;

use crate::{
    catalog::{ModelRecord, Provider},
    providers::{Credential, ModelScan, ModelSource, error::DiscoveryError},
};

/// Build a bare test record.
pub fn record(provider: Provider, id: &str) -> ModelRecord {
    ModelRecord::new(provider, id, Utc::now())
}

/// A [`ModelSource`] that replays a script of outcomes.
///
/// Each `list_models` call consumes the next scripted outcome; once the
/// script is exhausted the last outcome repeats. Calls are counted.
pub struct ScriptedSource {
    provider: Provider,
    script: Mutex<Vec<Result<ModelScan, DiscoveryError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(provider: Provider, script: Vec<Result<ModelScan, DiscoveryError>>) -> Self {
        assert!(!script.is_empty(), "script must have at least one outcome");
        Self {
            provider,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always succeed with the given models.
    pub fn ok(provider: Provider, models: Vec<ModelRecord>) -> Self {
        Self::new(provider, vec![Ok(ModelScan::from_models(models))])
    }

    /// Always fail with the given error.
    pub fn fail(provider: Provider, error: DiscoveryError) -> Self {
        Self::new(provider, vec![Err(error)])
    }

    /// How many times `list_models` has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelSource for ScriptedSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn list_models(
        &self,
        _client: &reqwest::Client,
        _credential: &Credential,
    ) -> Result<ModelScan, DiscoveryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap();
        let outcome = script.get(call).unwrap_or_else(|| {
            script.last().expect("script is non-empty by construction")
        });
        outcome.clone()
    }
}

/// A [`ModelSource`] that sleeps before answering, for timeout tests.
pub struct SlowSource {
    provider: Provider,
    delay: std::time::Duration,
    models: Vec<ModelRecord>,
    calls: AtomicUsize,
}

impl SlowSource {
    pub fn new(provider: Provider, delay: std::time::Duration, models: Vec<ModelRecord>) -> Self {
        Self {
            provider,
            delay,
            models,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelSource for SlowSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn list_models(
        &self,
        _client: &reqwest::Client,
        _credential: &Credential,
    ) -> Result<ModelScan, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ModelScan::from_models(self.models.clone()))
    }
}
