//! List-endpoint catalog source for OpenAI-compatible APIs.
//!
//! A single `GET /models` call returns a flat list. Fields map directly;
//! unknown fields are ignored. The endpoint advertises no capability data,
//! so capability fields stay unknown unless the id is in the built-in
//! enrichment table.

use chrono::Utc;
use tracing::debug;

use crate::{
    catalog::{ModelPricing, ModelRecord, Provider},
    config::ProviderSettings,
    providers::{
        Credential, ModelScan, ModelSource,
        error::{self, DiscoveryError},
    },
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Identifier prefixes that mark a model as chat/text-capable. Everything
/// else on the list endpoint (embeddings, audio, moderation) is skipped.
const CHAT_MODEL_PREFIXES: &[&str] = &["gpt-", "text-", "davinci"];

/// Catalog source for OpenAI-style list endpoints.
pub struct OpenAiCatalogSource {
    base_url: String,
}

impl OpenAiCatalogSource {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Wire shape of the list endpoint.
#[derive(Debug, serde::Deserialize)]
struct ListModelsResponse {
    data: Vec<ListedModel>,
}

#[derive(Debug, serde::Deserialize)]
struct ListedModel {
    id: String,
    #[serde(default)]
    created: Option<i64>,
}

fn is_chat_model(id: &str) -> bool {
    let id = id.to_lowercase();
    CHAT_MODEL_PREFIXES.iter().any(|p| id.contains(p))
}

fn normalize(listed: ListedModel) -> ModelRecord {
    let mut record = ModelRecord::new(Provider::OpenAi, listed.id, Utc::now());

    if let Some(created) = listed.created {
        record.description = chrono::DateTime::from_timestamp(created, 0)
            .map(|ts| format!("Released {}", ts.format("%Y-%m-%d")));
    }

    if let Some(known) = known_model(&record.id) {
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

/// Capability data for well-known model ids. The list endpoint itself
/// advertises nothing beyond the id; ids not in this table keep unknown
/// capabilities rather than fabricated ones.
fn known_model(id: &str) -> Option<KnownModel> {
    match id {
        "gpt-4o" => Some(KnownModel {
            display_name: "GPT-4 Optimized",
            context_window: 128_000,
            max_output_tokens: 4096,
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: true,
            pricing: ModelPricing {
                input_per_1k: 0.005,
                output_per_1k: 0.015,
            },
        }),
        "gpt-4o-mini" => Some(KnownModel {
            display_name: "GPT-4 Mini",
            context_window: 128_000,
            max_output_tokens: 4096,
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: true,
            pricing: ModelPricing {
                input_per_1k: 0.00015,
                output_per_1k: 0.0006,
            },
        }),
        "gpt-3.5-turbo" => Some(KnownModel {
            display_name: "GPT-3.5 Turbo",
            context_window: 16_385,
            max_output_tokens: 4096,
            supports_functions: true,
            supports_vision: false,
            supports_json_mode: true,
            pricing: ModelPricing {
                input_per_1k: 0.0005,
                output_per_1k: 0.0015,
            },
        }),
        _ => None,
    }
}

#[async_trait::async_trait]
impl ModelSource for OpenAiCatalogSource {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    #[tracing::instrument(skip(self, client, credential), fields(provider = "openai"))]
    async fn list_models(
        &self,
        client: &reqwest::Client,
        credential: &Credential,
    ) -> Result<ModelScan, DiscoveryError> {
        let url = format!("{}/models", self.base_url);

        let response = client
            .get(&url)
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| DiscoveryError::from_reqwest(Provider::OpenAi, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = error::retry_after_from_headers(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::from_status(
                Provider::OpenAi,
                status,
                retry_after,
                error::error_message_from_body(&body),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::from_reqwest(Provider::OpenAi, e))?;
        let listing: ListModelsResponse =
            serde_json::from_str(&body).map_err(|e| DiscoveryError::MalformedResponse {
                provider: Provider::OpenAi,
                message: e.to_string(),
            })?;

        let total = listing.data.len();
        let mut models: Vec<ModelRecord> = listing
            .data
            .into_iter()
            .filter(|m| is_chat_model(&m.id))
            .map(normalize)
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            total,
            chat_models = models.len(),
            "normalized openai model listing"
        );

        Ok(ModelScan::from_models(models))
    }
}
