//! Trial-and-error catalog source for the Anthropic API.
//!
//! Anthropic exposes no model enumeration endpoint, so availability is
//! probed: each identifier on a versioned allow-list gets a minimal
//! one-token message request. Probes run concurrently, each under its own
//! timeout. A model is included only when its probe succeeds; probe failures
//! are per-model and do not fail the scan unless every probe fails. A
//! rejected credential fails the whole scan immediately, since one 401 means all
//! probes would 401.

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    catalog::{ModelPricing, ModelRecord, Provider},
    config::ProviderSettings,
    providers::{
        Credential, ModelScan, ModelSource,
        error::{self, DiscoveryError},
    },
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

const API_VERSION: &str = "2023-06-01";

/// Known model identifiers to probe when the configuration does not supply
/// its own allow-list.
const DEFAULT_PROBE_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

/// Catalog source that probes a static allow-list of model ids.
pub struct AnthropicCatalogSource {
    base_url: String,
    probe_models: Vec<String>,
    probe_timeout: std::time::Duration,
}

impl AnthropicCatalogSource {
    pub fn new(settings: &ProviderSettings) -> Self {
        let probe_models = if settings.probe_models.is_empty() {
            DEFAULT_PROBE_MODELS.iter().map(|s| s.to_string()).collect()
        } else {
            settings.probe_models.clone()
        };

        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            probe_models,
            probe_timeout: settings.probe_timeout(),
        }
    }

    /// Probe one model with a minimal message request.
    async fn probe(
        &self,
        client: &reqwest::Client,
        credential: &Credential,
        model_id: &str,
    ) -> Result<(), DiscoveryError> {
        let url = format!("{}/messages", self.base_url);
        let body = json!({
            "model": model_id,
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "hi"}],
        });

        let send = client
            .post(&url)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send();

        let response = match tokio::time::timeout(self.probe_timeout, send).await {
            Ok(result) => result.map_err(|e| DiscoveryError::from_reqwest(Provider::Anthropic, e))?,
            Err(_) => {
                return Err(DiscoveryError::Transport {
                    provider: Provider::Anthropic,
                    message: format!(
                        "probe of '{model_id}' timed out after {:?}",
                        self.probe_timeout
                    ),
                });
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after = error::retry_after_from_headers(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(DiscoveryError::from_status(
            Provider::Anthropic,
            status,
            retry_after,
            error::error_message_from_body(&body),
        ))
    }
}

fn normalize(model_id: &str) -> ModelRecord {
    let mut record = ModelRecord::new(Provider::Anthropic, model_id, Utc::now());

    if let Some(known) = known_model(model_id) {
        record.display_name = Some(known.display_name.to_string());
        record.context_window = Some(known.context_window);
        record.max_output_tokens = Some(known.max_output_tokens);
        record.supports_functions = Some(known.supports_functions);
        record.supports_vision = Some(known.supports_vision);
        record.supports_json_mode = Some(known.supports_json_mode);
        record.pricing = Some(known.pricing);
    }

    record
}

struct KnownModel {
    display_name: &'static str,
    context_window: i64,
    max_output_tokens: i64,
    supports_functions: bool,
    supports_vision: bool,
    supports_json_mode: bool,
    pricing: ModelPricing,
}

/// Capability data for the probed model ids. A successful probe only proves
/// availability; everything else comes from here. Ids probed via a custom
/// allow-list that are not in this table keep unknown capabilities.
fn known_model(id: &str) -> Option<KnownModel> {
    match id {
        "claude-3-5-sonnet-20241022" => Some(KnownModel {
            display_name: "Claude 3.5 Sonnet",
            context_window: 200_000,
            max_output_tokens: 8192,
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: false,
            pricing: ModelPricing {
                input_per_1k: 0.003,
                output_per_1k: 0.015,
            },
        }),
        "claude-3-opus-20240229" => Some(KnownModel {
            display_name: "Claude 3 Opus",
            context_window: 200_000,
            max_output_tokens: 4096,
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: false,
            pricing: ModelPricing {
                input_per_1k: 0.015,
                output_per_1k: 0.075,
            },
        }),
        "claude-3-sonnet-20240229" => Some(KnownModel {
            display_name: "Claude 3 Sonnet",
            context_window: 200_000,
            max_output_tokens: 4096,
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: false,
            pricing: ModelPricing {
                input_per_1k: 0.003,
                output_per_1k: 0.015,
            },
        }),
        "claude-3-haiku-20240307" => Some(KnownModel {
            display_name: "Claude 3 Haiku",
            context_window: 200_000,
            max_output_tokens: 4096,
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: false,
            pricing: ModelPricing {
                input_per_1k: 0.00025,
                output_per_1k: 0.00125,
            },
        }),
        _ => None,
    }
}

#[async_trait::async_trait]
impl ModelSource for AnthropicCatalogSource {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    #[tracing::instrument(skip(self, client, credential), fields(provider = "anthropic"))]
    async fn list_models(
        &self,
        client: &reqwest::Client,
        credential: &Credential,
    ) -> Result<ModelScan, DiscoveryError> {
        let probes = self.probe_models.iter().map(|model_id| async move {
            let outcome = self.probe(client, credential, model_id).await;
            (model_id.as_str(), outcome)
        });

        let outcomes = join_all(probes).await;

        let mut models = Vec::new();
        let mut failed_probes = 0;
        let mut first_failure = None;

        for (model_id, outcome) in outcomes {
            match outcome {
                Ok(()) => models.push(normalize(model_id)),
                // One rejected credential means every probe would be
                // rejected; surface it as the scan's failure.
                Err(err @ DiscoveryError::Authentication { .. }) => return Err(err),
                Err(err) => {
                    debug!(model = model_id, error = %err, "model probe failed");
                    failed_probes += 1;
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        if models.is_empty() {
            if let Some(err) = first_failure {
                warn!(
                    probed = self.probe_models.len(),
                    "every availability probe failed"
                );
                return Err(err);
            }
        }

        if failed_probes > 0 {
            debug!(
                available = models.len(),
                failed_probes, "partial probe results"
            );
        }

        Ok(ModelScan {
            models,
            failed_probes,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn source_with_probes(server: &MockServer, probes: &[&str]) -> AnthropicCatalogSource {
        AnthropicCatalogSource::new(&ProviderSettings {
            base_url: Some(server.uri()),
            probe_models: probes.iter().map(|s| s.to_string()).collect(),
            probe_timeout_secs: 2,
            ..Default::default()
        })
    }

    fn probe_ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hi"}],
            "model": "claude-3-5-sonnet-20241022",
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 8, "output_tokens": 1}
        }))
    }

    fn probe_not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "type": "error",
            "error": {"type": "not_found_error", "message": "model not found"}
        }))
    }

    #[tokio::test]
    async fn test_partial_probe_failure_returns_subset() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({"model": "m2"})))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream error"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(probe_ok())
            .mount(&server)
            .await;

        let source = source_with_probes(&server, &["m1", "m2", "m3"]);
        let scan = source
            .list_models(&reqwest::Client::new(), &Credential::new("k"))
            .await
            .unwrap();

        let ids: Vec<&str> = scan.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(scan.failed_probes, 1);
    }

    #[tokio::test]
    async fn test_unavailable_model_is_skipped_not_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({"model": "claude-2.0"})))
            .respond_with(probe_not_found())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(probe_ok())
            .mount(&server)
            .await;

        let source =
            source_with_probes(&server, &["claude-3-5-sonnet-20241022", "claude-2.0"]);
        let scan = source
            .list_models(&reqwest::Client::new(), &Credential::new("k"))
            .await
            .unwrap();

        assert_eq!(scan.models.len(), 1);
        assert_eq!(scan.models[0].id, "claude-3-5-sonnet-20241022");
        assert_eq!(scan.failed_probes, 1);
    }

    #[tokio::test]
    async fn test_all_probes_failing_is_a_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let source = source_with_probes(&server, &["m1", "m2"]);
        let err = source
            .list_models(&reqwest::Client::new(), &Credential::new("k"))
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_rejected_credential_fails_whole_scan() {
        let server = MockServer::start().await;

        // First probed model answers, the second rejects the key; the scan
        // must still fail as an authentication error.
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({"model": "m1"})))
            .respond_with(probe_ok())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .mount(&server)
            .await;

        let source = source_with_probes(&server, &["m1", "m2"]);
        let err = source
            .list_models(&reqwest::Client::new(), &Credential::new("bad"))
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_probe_sends_versioned_minimal_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({"max_tokens": 1})))
            .respond_with(probe_ok())
            .expect(1)
            .mount(&server)
            .await;

        let source = source_with_probes(&server, &["claude-3-haiku-20240307"]);
        let scan = source
            .list_models(&reqwest::Client::new(), &Credential::new("sk-ant-key"))
            .await
            .unwrap();
        assert_eq!(scan.models.len(), 1);
    }

    #[tokio::test]
    async fn test_known_models_are_enriched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(probe_ok())
            .mount(&server)
            .await;

        let source = source_with_probes(&server, &["claude-3-haiku-20240307"]);
        let scan = source
            .list_models(&reqwest::Client::new(), &Credential::new("k"))
            .await
            .unwrap();

        let haiku = &scan.models[0];
        assert_eq!(haiku.display_name.as_deref(), Some("Claude 3 Haiku"));
        assert_eq!(haiku.context_window, Some(200_000));
        assert_eq!(haiku.supports_vision, Some(true));
        assert_eq!(haiku.supports_json_mode, Some(false));
    }

    #[test]
    fn test_default_allow_list_used_when_unconfigured() {
        let source = AnthropicCatalogSource::new(&ProviderSettings::default());
        assert_eq!(source.probe_models.len(), DEFAULT_PROBE_MODELS.len());
        assert_eq!(source.probe_models[0], "claude-3-5-sonnet-20241022");
    }
}
