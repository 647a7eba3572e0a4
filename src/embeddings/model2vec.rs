//! Model2Vec embedding provider.
//!
//! Static token vectors averaged per text: no server, sub-millisecond
//! inference, and a one-time download from the HuggingFace Hub. A good fit
//! for a catalog re-index on a laptop.

use crate::error::{Error, Result};
use model2vec_rs::model::StaticModel;
use std::sync::Arc;
use tracing::debug;

use super::provider::EmbeddingProvider;
use super::types::{model2vec_models, ProviderInfo};

/// Provider over a loaded static model.
pub struct Model2VecProvider {
    model: Arc<StaticModel>,
    model_name: String,
    dimensions: usize,
    max_chars: usize,
}

impl Model2VecProvider {
    /// Load a model by Hub name, the default model when `None`.
    ///
    /// The declared dimensionality is measured from the loaded model, so an
    /// unlisted model still reports the right size to the store.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingUnavailable` if the model cannot be loaded.
    pub fn with_model(model_name: Option<String>) -> Result<Self> {
        let model_name = model_name.unwrap_or_else(|| model2vec_models::default_config().name);
        let listed = model2vec_models::get_config(&model_name);

        let model = StaticModel::from_pretrained(&model_name, None, None, None).map_err(|e| {
            Error::EmbeddingUnavailable(format!("failed to load Model2Vec model '{model_name}': {e}"))
        })?;

        let dimensions = model
            .encode(&["dimension probe".to_string()])
            .first()
            .map_or(listed.dimensions, Vec::len);
        debug!(model = %model_name, dimensions, "loaded Model2Vec model");

        Ok(Self {
            model: Arc::new(model),
            model_name,
            dimensions,
            max_chars: listed.max_chars,
        })
    }

    fn clip(&self, text: &str) -> String {
        text.chars().take(self.max_chars).collect()
    }
}

impl EmbeddingProvider for Model2VecProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "model2vec".to_string(),
            model: self.model_name.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.model
            .encode(&[self.clip(text)])
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingUnavailable("Model2Vec returned no embedding".into()))
    }

    async fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let clipped: Vec<String> = texts.iter().map(|t| self.clip(t)).collect();
        let vectors = self.model.encode(&clipped);
        if vectors.len() == texts.len() {
            Ok(vectors)
        } else {
            Err(Error::EmbeddingUnavailable(format!(
                "Model2Vec returned {} embeddings for {} texts",
                vectors.len(),
                texts.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model2vec_config_lookup() {
        let config = model2vec_models::get_config("minishlab/potion-base-8M");
        assert_eq!(config.dimensions, 256);
        assert_eq!(
            model2vec_models::get_config("potion-base-32M").name,
            "minishlab/potion-base-32M"
        );
    }
}
