//! Similarity search and ingestion.
//!
//! [`SearchService`] ties an [`EmbeddingProvider`](crate::embeddings::EmbeddingProvider)
//! to a [`VectorStore`](crate::store::VectorStore). It is constructed
//! explicitly from both and shared by reference (or `Arc`) across tasks;
//! there is no global instance.

mod batch;
mod service;

pub use batch::{BatchFailure, BatchReport};
pub use service::SearchService;

use std::time::Duration;

/// Default number of results, as the storefront's `/search/` endpoint uses.
pub const DEFAULT_K: usize = 3;

/// Timeouts applied to every provider and store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Bound on a single embedding call; exceeding it is `EmbeddingUnavailable`.
    pub embed_timeout: Duration,
    /// Bound on a single store call; exceeding it is `StoreUnavailable`.
    pub store_timeout: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            embed_timeout: Duration::from_millis(crate::config::DEFAULT_EMBED_TIMEOUT_MS),
            store_timeout: Duration::from_millis(crate::config::DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}
