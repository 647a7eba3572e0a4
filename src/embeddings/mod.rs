//! Embedding providers for product search.
//!
//! Turns catalog and query text into fixed-length vectors:
//! - **Ollama** (local server) - `all-minilm` by default, 384 dims
//! - **HuggingFace** (cloud) - requires `HF_TOKEN`
//! - **Model2Vec** (local static model) - no server, downloads once
//! - **Hashing** (offline) - deterministic bag of words, for tests and air-gapped runs
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐
//! │ SearchService / CLI   │
//! └──────────┬────────────┘
//!            ▼
//! ┌───────────────────────┐
//! │       Factory         │  ← --provider > SFS_PROVIDER > config > auto-detect
//! └──────────┬────────────┘
//!     ┌──────┼─────────┬──────────┐
//!     ▼      ▼         ▼          ▼
//! ┌──────┐┌────────┐┌─────────┐┌───────┐
//! │Ollama││HF API  ││Model2Vec││Hashing│
//! └──────┘└────────┘└─────────┘└───────┘
//! ```
//!
//! # Configuration
//!
//! Settings are loaded from the `embeddings` section of
//! `~/.storefront-search/config.json`. Environment variables take precedence:
//! - `SFS_PROVIDER` - `ollama`, `huggingface`, `model2vec` or `hashing`
//! - `OLLAMA_ENDPOINT` - Ollama server URL (default: `http://localhost:11434`)
//! - `OLLAMA_MODEL` - Embedding model (default: `all-minilm`)
//! - `HF_TOKEN` - HuggingFace API token
//! - `HF_MODEL` - HuggingFace model (default: `sentence-transformers/all-MiniLM-L6-v2`)
//! - `SFS_HASH_DIMENSIONS` - Hashing provider dimensionality (default: 384)

pub mod config;
pub mod factory;
pub mod hashing;
pub mod huggingface;
pub mod model2vec;
pub mod ollama;
pub mod provider;
pub mod types;

pub use config::{
    get_embedding_settings, reset_embedding_settings, resolve_hf_model, resolve_hf_token,
    resolve_ollama_endpoint, resolve_ollama_model, resolve_provider_type, save_embedding_settings,
};
pub use factory::{
    create_embedding_provider, create_provider_by_type, detect_available_providers,
    ProviderDetection,
};
pub use hashing::HashingProvider;
pub use huggingface::HuggingFaceProvider;
pub use model2vec::Model2VecProvider;
pub use ollama::OllamaProvider;
pub use provider::{BoxedProvider, EmbeddingProvider};
pub use types::{EmbeddingProviderType, EmbeddingSettings, ModelConfig, ProviderInfo};
