//! Embedding types and configuration.
//!
//! Settings are persisted in the `embeddings` section of
//! `~/.storefront-search/config.json`.

use serde::{Deserialize, Serialize};

/// Embedding provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    Ollama,
    Huggingface,
    /// Model2Vec - local static embeddings
    Model2vec,
    /// Feature-hashed bag of words - offline and deterministic
    Hashing,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Huggingface => write!(f, "huggingface"),
            Self::Model2vec => write!(f, "model2vec"),
            Self::Hashing => write!(f, "hashing"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "huggingface" | "hf" => Ok(Self::Huggingface),
            "model2vec" => Ok(Self::Model2vec),
            "hashing" | "hash" => Ok(Self::Hashing),
            _ => Err(format!(
                "Unknown provider: {s}. Valid options: ollama, huggingface, model2vec, hashing"
            )),
        }
    }
}

/// Embedding settings stored in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: Option<EmbeddingProviderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model2vec_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_dimensions: Option<usize>,
}

impl EmbeddingSettings {
    /// Merge `self` over `base`: fields set here win.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            provider: self.provider.or(base.provider),
            hf_token: self.hf_token.clone().or_else(|| base.hf_token.clone()),
            hf_model: self.hf_model.clone().or_else(|| base.hf_model.clone()),
            hf_endpoint: self.hf_endpoint.clone().or_else(|| base.hf_endpoint.clone()),
            ollama_endpoint: self
                .ollama_endpoint
                .clone()
                .or_else(|| base.ollama_endpoint.clone()),
            ollama_model: self.ollama_model.clone().or_else(|| base.ollama_model.clone()),
            model2vec_model: self
                .model2vec_model
                .clone()
                .or_else(|| base.model2vec_model.clone()),
            hash_dimensions: self.hash_dimensions.or(base.hash_dimensions),
        }
    }
}

/// Provider metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    /// Declared output dimensionality.
    pub dimensions: usize,
    pub max_chars: usize,
}

/// Model configuration with dimensions and max chars.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub dimensions: usize,
    pub max_chars: usize,
}

/// Ollama model configurations.
pub mod ollama_models {
    use super::ModelConfig;

    /// Same network as `sentence-transformers/all-MiniLM-L6-v2`.
    pub fn all_minilm() -> ModelConfig {
        ModelConfig {
            name: "all-minilm".to_string(),
            dimensions: 384,
            max_chars: 800,
        }
    }

    pub fn nomic_embed_text() -> ModelConfig {
        ModelConfig {
            name: "nomic-embed-text".to_string(),
            dimensions: 768,
            max_chars: 5000,
        }
    }

    pub fn mxbai_embed_large() -> ModelConfig {
        ModelConfig {
            name: "mxbai-embed-large".to_string(),
            dimensions: 1024,
            max_chars: 1500,
        }
    }

    pub fn default_config() -> ModelConfig {
        all_minilm()
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model.split(':').next().unwrap_or(model) {
            "all-minilm" => all_minilm(),
            "nomic-embed-text" => nomic_embed_text(),
            "mxbai-embed-large" => mxbai_embed_large(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 384, // Default assumption
                max_chars: 800,
            },
        }
    }
}

/// HuggingFace model configurations.
pub mod huggingface_models {
    use super::ModelConfig;

    pub fn all_minilm_l6_v2() -> ModelConfig {
        ModelConfig {
            name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            max_chars: 800,
        }
    }

    pub fn all_mpnet_base_v2() -> ModelConfig {
        ModelConfig {
            name: "sentence-transformers/all-mpnet-base-v2".to_string(),
            dimensions: 768,
            max_chars: 1500,
        }
    }

    pub fn default_config() -> ModelConfig {
        all_minilm_l6_v2()
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model {
            "sentence-transformers/all-MiniLM-L6-v2" => all_minilm_l6_v2(),
            "sentence-transformers/all-mpnet-base-v2" => all_mpnet_base_v2(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 384, // Default assumption
                max_chars: 800,
            },
        }
    }
}

/// Model2Vec model configurations (static embeddings).
pub mod model2vec_models {
    use super::ModelConfig;

    /// potion-base-8M - fast 256d embeddings
    pub fn potion_base_8m() -> ModelConfig {
        ModelConfig {
            name: "minishlab/potion-base-8M".to_string(),
            dimensions: 256,
            max_chars: 2048,
        }
    }

    /// potion-base-32M - larger 256d embeddings
    pub fn potion_base_32m() -> ModelConfig {
        ModelConfig {
            name: "minishlab/potion-base-32M".to_string(),
            dimensions: 256,
            max_chars: 2048,
        }
    }

    pub fn default_config() -> ModelConfig {
        potion_base_8m()
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model {
            "minishlab/potion-base-8M" | "potion-base-8M" => potion_base_8m(),
            "minishlab/potion-base-32M" | "potion-base-32M" => potion_base_32m(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 256, // Model2Vec default
                max_chars: 2048,
            },
        }
    }
}
