//! Embedding provider trait.
//!
//! Defines the interface that all embedding providers must implement.
//! Uses async methods for HTTP-based providers.

use super::types::ProviderInfo;
use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Trait for embedding providers.
///
/// A provider maps text to a vector of exactly `info().dimensions` floats.
/// Failures are reported as `Error::EmbeddingUnavailable`.
pub trait EmbeddingProvider: Send + Sync {
    /// Get provider metadata.
    fn info(&self) -> ProviderInfo;

    /// Check if the provider is available.
    ///
    /// For Ollama, this checks if the server is running and the model is pulled.
    /// For HuggingFace, this checks that an API token is configured.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Generate embedding for a single text.
    fn generate_embedding(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;

    /// Generate embeddings for multiple texts (batch).
    ///
    /// Default implementation calls `generate_embedding` for each text.
    fn generate_embeddings(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        async move {
            let mut results = Vec::with_capacity(texts.len());
            for text in texts {
                results.push(self.generate_embedding(text).await?);
            }
            Ok(results)
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed provider for dynamic dispatch.
///
/// Since the trait has async methods with `impl Future`, we need this wrapper
/// for runtime provider selection.
pub struct BoxedProvider {
    inner: Box<dyn EmbeddingProviderBoxed + Send + Sync>,
}

/// Object-safe version of `EmbeddingProvider` for boxing.
trait EmbeddingProviderBoxed: Send + Sync {
    fn info(&self) -> ProviderInfo;
    fn is_available_boxed(&self) -> BoxFuture<'_, bool>;
    fn generate_embedding_boxed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>>>;
    fn generate_embeddings_boxed(&self, texts: &[&str]) -> BoxFuture<'_, Result<Vec<Vec<f32>>>>;
}

impl BoxedProvider {
    /// Create a new boxed provider.
    pub fn new<P: EmbeddingProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Box::new(BoxedProviderWrapper(provider)),
        }
    }
}

impl std::fmt::Debug for BoxedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.inner.info();
        f.debug_struct("BoxedProvider")
            .field("name", &info.name)
            .field("model", &info.model)
            .finish()
    }
}

impl EmbeddingProvider for BoxedProvider {
    fn info(&self) -> ProviderInfo {
        self.inner.info()
    }

    fn is_available(&self) -> impl Future<Output = bool> + Send {
        self.inner.is_available_boxed()
    }

    fn generate_embedding(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send {
        self.inner.generate_embedding_boxed(text)
    }

    fn generate_embeddings(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        self.inner.generate_embeddings_boxed(texts)
    }
}

/// Wrapper to implement `EmbeddingProviderBoxed` for any `EmbeddingProvider`.
struct BoxedProviderWrapper<P: EmbeddingProvider + 'static>(P);

impl<P: EmbeddingProvider + 'static> EmbeddingProviderBoxed for BoxedProviderWrapper<P> {
    fn info(&self) -> ProviderInfo {
        self.0.info()
    }

    fn is_available_boxed(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.0.is_available())
    }

    fn generate_embedding_boxed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>>> {
        // Owned copy so the future does not borrow the caller's text.
        let text_owned = text.to_string();
        Box::pin(async move { self.0.generate_embedding(&text_owned).await })
    }

    fn generate_embeddings_boxed(&self, texts: &[&str]) -> BoxFuture<'_, Result<Vec<Vec<f32>>>> {
        let texts_owned: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();
        Box::pin(async move {
            let refs: Vec<&str> = texts_owned.iter().map(String::as_str).collect();
            self.0.generate_embeddings(&refs).await
        })
    }
}
