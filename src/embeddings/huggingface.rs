//! HuggingFace Inference API embedding provider.
//!
//! Uses HuggingFace's hosted feature-extraction pipeline.
//! Requires a HuggingFace API token (`HF_TOKEN`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

use super::config::{resolve_hf_endpoint, resolve_hf_model, resolve_hf_token};
use super::provider::EmbeddingProvider;
use super::types::{huggingface_models, ProviderInfo};

/// HuggingFace Inference API embedding provider.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
    dimensions: usize,
    max_chars: usize,
}

impl HuggingFaceProvider {
    /// Create a new HuggingFace provider with default configuration.
    ///
    /// Returns `None` if no API token is configured.
    pub fn new() -> Option<Self> {
        Self::with_config(None, None, None)
    }

    /// Create a new HuggingFace provider with custom configuration.
    ///
    /// Returns `None` if no API token is available.
    pub fn with_config(
        endpoint: Option<String>,
        model: Option<String>,
        token: Option<String>,
    ) -> Option<Self> {
        let token = token.or_else(resolve_hf_token).filter(|t| !t.is_empty())?;
        let endpoint = endpoint.unwrap_or_else(resolve_hf_endpoint);
        let model = model.unwrap_or_else(resolve_hf_model);
        let config = huggingface_models::get_config(&model);

        Some(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            token,
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.endpoint, self.model
        )
    }

    async fn post(&self, inputs: HfInputs<'_>) -> Result<HfEmbedResponse> {
        let request = HfEmbedRequest {
            inputs,
            options: HfOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("HuggingFace request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "HuggingFace API error ({status}): {error}"
            )));
        }

        response.json().await.map_err(|e| {
            Error::EmbeddingUnavailable(format!("Failed to parse HuggingFace response: {e}"))
        })
    }
}

/// HuggingFace API request for feature extraction.
#[derive(Debug, Serialize)]
struct HfEmbedRequest<'a> {
    inputs: HfInputs<'a>,
    options: HfOptions,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum HfInputs<'a> {
    Single(&'a str),
    Batch(Vec<&'a str>),
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

/// HuggingFace API response - shape depends on model and input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfEmbedResponse {
    /// Direct embedding (sentence-transformers, single input)
    Direct(Vec<f32>),
    /// One embedding per input, or a nested single embedding
    Single(Vec<Vec<f32>>),
    /// Token-level batch output
    Batch(Vec<Vec<Vec<f32>>>),
}

impl EmbeddingProvider for HuggingFaceProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "huggingface".to_string(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        // A configured token is the only cheap check; pinging burns quota.
        !self.token.is_empty()
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        match self.post(HfInputs::Single(text)).await? {
            HfEmbedResponse::Direct(embedding) => Ok(embedding),
            HfEmbedResponse::Single(nested) => nested
                .into_iter()
                .next()
                .ok_or_else(|| Error::EmbeddingUnavailable("No embeddings in response".into())),
            HfEmbedResponse::Batch(batch) => batch
                .into_iter()
                .next()
                .and_then(|nested| nested.into_iter().next())
                .ok_or_else(|| {
                    Error::EmbeddingUnavailable("No embeddings in batch response".into())
                }),
        }
    }

    async fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = match self.post(HfInputs::Batch(texts.to_vec())).await? {
            HfEmbedResponse::Single(rows) => rows,
            HfEmbedResponse::Direct(embedding) => vec![embedding],
            HfEmbedResponse::Batch(batch) => batch
                .into_iter()
                .filter_map(|nested| nested.into_iter().next())
                .collect(),
        };

        if embeddings.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "HuggingFace returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }
}
