//! Embedding configuration management.
//!
//! Embedding settings live in the `embeddings` section of
//! `~/.storefront-search/config.json`. Each resolver applies
//! env var > config > default.

use crate::config::{env_var, load_config, save_config};
use crate::error::Result;

use super::hashing::DEFAULT_HASH_DIMENSIONS;
use super::types::{
    huggingface_models, model2vec_models, ollama_models, EmbeddingProviderType, EmbeddingSettings,
};

/// Get embedding settings from config file.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn get_embedding_settings() -> Result<Option<EmbeddingSettings>> {
    Ok(load_config()?.embeddings)
}

/// Save embedding settings (merges with existing config).
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written.
pub fn save_embedding_settings(settings: &EmbeddingSettings) -> Result<()> {
    let mut config = load_config()?;
    let existing = config.embeddings.unwrap_or_default();
    config.embeddings = Some(settings.merged_over(&existing));
    save_config(&config)
}

/// Reset embedding settings (removes from config).
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written.
pub fn reset_embedding_settings() -> Result<()> {
    let mut config = load_config()?;
    config.embeddings = None;
    save_config(&config)
}

/// Settings from the config file, or empty when absent or unreadable.
fn stored_settings() -> EmbeddingSettings {
    get_embedding_settings().ok().flatten().unwrap_or_default()
}

/// Resolve the configured provider type: `SFS_PROVIDER` > config.
///
/// `None` means auto-detect. An unparsable `SFS_PROVIDER` is ignored with
/// a warning.
pub fn resolve_provider_type() -> Option<EmbeddingProviderType> {
    if let Some(raw) = env_var("SFS_PROVIDER") {
        match raw.parse() {
            Ok(provider) => return Some(provider),
            Err(e) => tracing::warn!(error = %e, "ignoring SFS_PROVIDER"),
        }
    }
    stored_settings().provider
}

/// Resolve Ollama endpoint from config or environment.
pub fn resolve_ollama_endpoint() -> String {
    env_var("OLLAMA_ENDPOINT")
        .or_else(|| stored_settings().ollama_endpoint)
        .unwrap_or_else(|| "http://localhost:11434".to_string())
}

/// Resolve Ollama model from config or environment.
pub fn resolve_ollama_model() -> String {
    env_var("OLLAMA_MODEL")
        .or_else(|| stored_settings().ollama_model)
        .unwrap_or_else(|| ollama_models::default_config().name)
}

/// Resolve HuggingFace token from config or environment.
pub fn resolve_hf_token() -> Option<String> {
    env_var("HF_TOKEN").or_else(|| stored_settings().hf_token)
}

/// Resolve HuggingFace model from config or environment.
pub fn resolve_hf_model() -> String {
    env_var("HF_MODEL")
        .or_else(|| stored_settings().hf_model)
        .unwrap_or_else(|| huggingface_models::default_config().name)
}

/// Resolve HuggingFace endpoint from config or environment.
pub fn resolve_hf_endpoint() -> String {
    env_var("HF_ENDPOINT")
        .or_else(|| stored_settings().hf_endpoint)
        .unwrap_or_else(|| "https://router.huggingface.co/hf-inference".to_string())
}

/// Resolve the Model2Vec model name from config.
pub fn resolve_model2vec_model() -> String {
    stored_settings()
        .model2vec_model
        .unwrap_or_else(|| model2vec_models::default_config().name)
}

/// Resolve the hashing provider's dimensionality.
pub fn resolve_hash_dimensions() -> usize {
    env_var("SFS_HASH_DIMENSIONS")
        .and_then(|raw| raw.trim().parse().ok())
        .or_else(|| stored_settings().hash_dimensions)
        .unwrap_or(DEFAULT_HASH_DIMENSIONS)
}
