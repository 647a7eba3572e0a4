//! Embedding provider factory.
//!
//! Handles provider detection and creation.

use tracing::{debug, info};

use super::config::{resolve_hash_dimensions, resolve_model2vec_model, resolve_provider_type};
use super::hashing::HashingProvider;
use super::huggingface::HuggingFaceProvider;
use super::model2vec::Model2VecProvider;
use super::ollama::OllamaProvider;
use super::provider::{BoxedProvider, EmbeddingProvider};
use super::types::EmbeddingProviderType;
use crate::error::{Error, Result};

/// Available provider detection result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderDetection {
    /// List of available provider names.
    pub available: Vec<String>,
    /// Recommended provider (first available network-backed model).
    pub recommended: Option<String>,
}

/// Detect which embedding providers are available.
///
/// The hashing provider is always available and is listed last; it is
/// only recommended when nothing else answers.
pub async fn detect_available_providers() -> ProviderDetection {
    let mut available = Vec::new();

    let ollama = OllamaProvider::new();
    if ollama.is_available().await {
        available.push(EmbeddingProviderType::Ollama.to_string());
    }

    // HuggingFace counts as available once a token is configured
    if let Some(hf) = HuggingFaceProvider::new() {
        if hf.is_available().await {
            available.push(EmbeddingProviderType::Huggingface.to_string());
        }
    }

    available.push(EmbeddingProviderType::Hashing.to_string());

    let recommended = available.first().cloned();

    ProviderDetection {
        available,
        recommended,
    }
}

/// Create an embedding provider.
///
/// Priority:
/// 1. `explicit` (the `--provider` flag)
/// 2. `SFS_PROVIDER` or the provider in the config file
/// 3. Auto-detect: Ollama, then HuggingFace
///
/// # Errors
///
/// Returns `EmbeddingUnavailable` if the chosen provider cannot be used or
/// auto-detection finds nothing.
pub async fn create_embedding_provider(
    explicit: Option<EmbeddingProviderType>,
) -> Result<BoxedProvider> {
    if let Some(provider_type) = explicit.or_else(resolve_provider_type) {
        debug!(provider = %provider_type, "using configured embedding provider");
        return create_provider_by_type(provider_type).await;
    }

    let ollama = OllamaProvider::new();
    if ollama.is_available().await {
        info!(model = %ollama.info().model, "auto-detected Ollama");
        return Ok(BoxedProvider::new(ollama));
    }

    if let Some(hf) = HuggingFaceProvider::new() {
        if hf.is_available().await {
            info!(model = %hf.info().model, "auto-detected HuggingFace");
            return Ok(BoxedProvider::new(hf));
        }
    }

    Err(Error::EmbeddingUnavailable(
        "no embedding provider detected (Ollama not running, HF_TOKEN not set)".into(),
    ))
}

/// Create a specific provider by type.
///
/// # Errors
///
/// Returns `EmbeddingUnavailable` if the provider cannot be constructed or,
/// for Ollama, the server or model is missing.
pub async fn create_provider_by_type(provider_type: EmbeddingProviderType) -> Result<BoxedProvider> {
    match provider_type {
        EmbeddingProviderType::Ollama => {
            let provider = OllamaProvider::new();
            if provider.is_available().await {
                Ok(BoxedProvider::new(provider))
            } else {
                Err(Error::EmbeddingUnavailable(format!(
                    "Ollama is not running or model '{}' is not pulled",
                    provider.info().model
                )))
            }
        }
        EmbeddingProviderType::Huggingface => HuggingFaceProvider::new()
            .map(BoxedProvider::new)
            .ok_or_else(|| Error::EmbeddingUnavailable("HF_TOKEN is not set".into())),
        EmbeddingProviderType::Model2vec => {
            let model = resolve_model2vec_model();
            // Loading may download the model; keep it off the async workers.
            let provider = tokio::task::spawn_blocking(move || Model2VecProvider::with_model(Some(model)))
                .await
                .map_err(|e| Error::EmbeddingUnavailable(format!("Model2Vec load task failed: {e}")))??;
            Ok(BoxedProvider::new(provider))
        }
        EmbeddingProviderType::Hashing => {
            Ok(BoxedProvider::new(HashingProvider::new(resolve_hash_dimensions())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_hashing_provider() {
        let provider = create_embedding_provider(Some(EmbeddingProviderType::Hashing))
            .await
            .unwrap();
        assert_eq!(provider.info().name, "hashing");
        assert!(provider.info().dimensions > 0);
    }
}
