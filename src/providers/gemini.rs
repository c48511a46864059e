//! Structured-catalog source for the Google Gemini API.
//!
//! The catalog endpoint nests models under a `"models"` collection with
//! camelCase field names. A model is only included when it advertises the
//! `generateContent` method; tuning, embedding, and AQA-only entries are not
//! usable for generation and are excluded.

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

const GENERATE_CONTENT: &str = "generateContent";

/// Catalog source for the Gemini models endpoint.
pub struct GeminiCatalogSource {
    base_url: String,
}

impl GeminiCatalogSource {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Wire shape of the catalog endpoint.
#[derive(Debug, serde::Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    models: Vec<CatalogEntry>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    /// Fully-qualified resource name, e.g. "models/gemini-1.5-pro".
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_token_limit: Option<i64>,
    #[serde(default)]
    output_token_limit: Option<i64>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl CatalogEntry {
    fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }

    /// The bare model id: the last segment of the resource name.
    fn model_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

fn normalize(entry: CatalogEntry) -> ModelRecord {
    let mut record = ModelRecord::new(Provider::Gemini, entry.model_id(), Utc::now());
    record.display_name = entry.display_name;
    record.description = entry.description.filter(|d| !d.is_empty());
    record.context_window = entry.input_token_limit;
    record.max_output_tokens = entry.output_token_limit;

    if let Some(known) = known_model(&record.id) {
        record.supports_functions = Some(known.supports_functions);
        record.supports_vision = Some(known.supports_vision);
        record.supports_json_mode = Some(known.supports_json_mode);
        record.pricing = Some(known.pricing);
    }

    record
}

struct KnownModel {
    supports_functions: bool,
    supports_vision: bool,
    supports_json_mode: bool,
    pricing: ModelPricing,
}

/// Capability data the catalog endpoint does not advertise. Unknown ids keep
/// unknown capabilities.
fn known_model(id: &str) -> Option<KnownModel> {
    match id {
        "gemini-1.5-pro" => Some(KnownModel {
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: true,
            pricing: ModelPricing {
                input_per_1k: 0.00125,
                output_per_1k: 0.005,
            },
        }),
        "gemini-1.5-flash" => Some(KnownModel {
            supports_functions: true,
            supports_vision: true,
            supports_json_mode: true,
            pricing: ModelPricing {
                input_per_1k: 0.000075,
                output_per_1k: 0.0003,
            },
        }),
        _ => None,
    }
}

#[async_trait::async_trait]
impl ModelSource for GeminiCatalogSource {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    #[tracing::instrument(skip(self, client, credential), fields(provider = "gemini"))]
    async fn list_models(
        &self,
        client: &reqwest::Client,
        credential: &Credential,
    ) -> Result<ModelScan, DiscoveryError> {
        let url = format!("{}/models", self.base_url);

        let response = client
            .get(&url)
            .query(&[("key", credential.expose())])
            .send()
            .await
            .map_err(|e| DiscoveryError::from_reqwest(Provider::Gemini, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = error::retry_after_from_headers(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::from_status(
                Provider::Gemini,
                status,
                retry_after,
                error::error_message_from_body(&body),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::from_reqwest(Provider::Gemini, e))?;
        let catalog: CatalogResponse =
            serde_json::from_str(&body).map_err(|e| DiscoveryError::MalformedResponse {
                provider: Provider::Gemini,
                message: e.to_string(),
            })?;

        let total = catalog.models.len();
        let mut models: Vec<ModelRecord> = catalog
            .models
            .into_iter()
            .filter(CatalogEntry::supports_generation)
            .map(normalize)
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            total,
            generation_models = models.len(),
            "normalized gemini model catalog"
        );

        Ok(ModelScan::from_models(models))
    }
}
