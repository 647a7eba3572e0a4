use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{BatchFailure, BatchReport, SearchOptions};
use crate::embeddings::{EmbeddingProvider, ProviderInfo};
use crate::error::{Error, Result};
use crate::model::{
    check_metadata, Document, IngestItem, Metadata, MetadataFilter, ScoredDocument,
};
use crate::store::{DistanceMetric, VectorStore};

/// Semantic search over a vector store.
///
/// Reads embed the query, filter on metadata, rank by distance and return
/// the top `k`. Writes embed the text and persist a new document. Both
/// embedding and store calls are bounded by [`SearchOptions`].
#[derive(Debug)]
pub struct SearchService<P, S> {
    provider: P,
    store: S,
    options: SearchOptions,
}

/// Texts sent to the provider per call during batch ingestion.
const EMBED_CHUNK: usize = 32;

fn millis(d: Duration) -> u128 {
    d.as_millis()
}

/// Reject what the store cannot take before spending an embedding on it.
fn validate(text: &str, metadata: &Metadata) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidArgument("text must not be empty".into()));
    }
    check_metadata(metadata)
}

impl<P: EmbeddingProvider, S: VectorStore> SearchService<P, S> {
    pub fn new(provider: P, store: S) -> Self {
        Self::with_options(provider, store, SearchOptions::default())
    }

    pub fn with_options(provider: P, store: S, options: SearchOptions) -> Self {
        Self {
            provider,
            store,
            options,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    pub fn provider_info(&self) -> ProviderInfo {
        self.provider.info()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.store.metric()
    }

    /// Take the store back, e.g. to close it.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Run a provider call under the embedding timeout.
    async fn within_embed_timeout<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.options.embed_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| {
                Error::EmbeddingUnavailable(format!(
                    "{} did not respond within {}ms",
                    self.provider.info().name,
                    millis(timeout)
                ))
            })?
            .map_err(|e| match e {
                Error::EmbeddingUnavailable(_) => e,
                other => Error::EmbeddingUnavailable(other.to_string()),
            })
    }

    /// Check a provider vector against the store.
    fn accept(&self, vector: Vec<f32>) -> Result<Vec<f32>> {
        let expected = self.store.dimensions();
        if vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::EmbeddingUnavailable(format!(
                "{} returned a vector with non-finite components",
                self.provider.info().name
            )));
        }
        Ok(vector)
    }

    /// Embed text under the embedding timeout and check the vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .within_embed_timeout(self.provider.generate_embedding(text))
            .await?;
        self.accept(vector)
    }

    /// Embed several texts in one provider call. Vectors are not checked.
    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let vectors = self
            .within_embed_timeout(self.provider.generate_embeddings(texts))
            .await?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "{} returned {} embeddings for {} texts",
                self.provider.info().name,
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    /// Run a store call under the store timeout.
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.options.store_timeout;
        tokio::time::timeout(timeout, call).await.map_err(|_| {
            Error::StoreUnavailable(format!(
                "{operation} did not complete within {}ms",
                millis(timeout)
            ))
        })?
    }

    /// Find the `k` documents nearest to `query`.
    ///
    /// With a filter, only documents whose metadata equals the filter on
    /// every key are candidates. Results are in ascending distance; ties go
    /// to the earlier document. Fewer than `k` matches is not an error.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a blank query or `k == 0`
    /// - `EmbeddingUnavailable` if the query cannot be embedded in time
    /// - `DimensionMismatch` if the provider disagrees with the store
    /// - `StoreUnavailable` / `Database` if the store fails or times out
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".into()));
        }
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".into()));
        }

        let vector = self.embed(query).await?;
        let filter = filter.filter(|f| !f.is_empty()).cloned();
        let filtered = filter.is_some();

        let hits = self
            .bounded("query", self.store.query(vector, k, filter))
            .await?;

        info!(k, filtered, hits = hits.len(), "search");
        Ok(hits)
    }

    /// Embed and store one text.
    ///
    /// The document gets a fresh UUID and a `created_at` timestamp, which
    /// is also written into its metadata.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for blank text or a non-finite metadata number
    /// - `EmbeddingUnavailable` if the text cannot be embedded in time
    /// - `DimensionMismatch` if the vector does not fit the store
    /// - `StoreUnavailable` / `Database` if the write fails or times out;
    ///   the document is then not stored
    pub async fn ingest(&self, text: &str, metadata: Metadata) -> Result<Document> {
        validate(text, &metadata)?;
        let vector = self.embed(text).await?;
        self.store_document(text, metadata, vector).await
    }

    async fn store_document(
        &self,
        text: &str,
        metadata: Metadata,
        vector: Vec<f32>,
    ) -> Result<Document> {
        let document = Document::new(text.to_string(), metadata, vector);
        let deadline = Instant::now() + self.options.store_timeout;

        self.store
            .insert_before(document.clone(), deadline)
            .await?;

        debug!(id = %document.id, "ingested document");
        Ok(document)
    }

    /// Ingest items in input order.
    ///
    /// Valid texts are embedded up front, [`EMBED_CHUNK`] per provider
    /// call; a chunk whose call fails falls back to one call per item so
    /// each item still gets its own outcome. Each failure is recorded with
    /// its index and the batch continues, except after a fatal error
    /// (dimension or configuration mismatch): then the rest of the batch is
    /// reported as skipped.
    pub async fn ingest_batch(&self, items: Vec<IngestItem>) -> BatchReport {
        let total = items.len();
        let mut report = BatchReport::default();

        let checks: Vec<Result<()>> = items
            .iter()
            .map(|item| validate(&item.text, &item.metadata))
            .collect();
        let valid: Vec<&str> = items
            .iter()
            .zip(&checks)
            .filter(|(_, check)| check.is_ok())
            .map(|(item, _)| item.text.as_str())
            .collect();

        let mut embedded: Vec<Option<Vec<f32>>> = Vec::with_capacity(valid.len());
        for chunk in valid.chunks(EMBED_CHUNK) {
            match self.embed_chunk(chunk).await {
                Ok(vectors) => embedded.extend(vectors.into_iter().map(Some)),
                Err(error) => {
                    debug!(
                        size = chunk.len(),
                        error = %error,
                        "chunk embedding failed, retrying per item"
                    );
                    embedded.extend(std::iter::repeat_n(None, chunk.len()));
                }
            }
        }
        let mut embedded = embedded.into_iter();

        for (index, (item, check)) in items.into_iter().zip(checks).enumerate() {
            let outcome = match check {
                Err(error) => Err(error),
                Ok(()) => {
                    let vector = match embedded.next().flatten() {
                        Some(vector) => self.accept(vector),
                        None => self.embed(&item.text).await,
                    };
                    match vector {
                        Ok(vector) => {
                            self.store_document(&item.text, item.metadata, vector).await
                        }
                        Err(error) => Err(error),
                    }
                }
            };

            match outcome {
                Ok(document) => report.succeeded.push(document),
                Err(error) => {
                    let fatal = error.is_fatal();
                    warn!(index, error = %error, fatal, "batch item failed");
                    report.failed.push(BatchFailure { index, error });
                    if fatal {
                        report.skipped.extend(index + 1..total);
                        report.halted = true;
                        break;
                    }
                }
            }
        }

        info!(
            total,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "batch ingest"
        );
        report
    }

    /// Fetch a document by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` / `Database` if the store fails.
    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        self.bounded("get", self.store.get(id)).await
    }

    /// Fetch a document by id, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if no document has this id.
    pub async fn require(&self, id: &str) -> Result<Document> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound { id: id.to_string() })
    }

    /// Documents in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` / `Database` if the store fails.
    pub async fn list(&self, limit: usize) -> Result<Vec<Document>> {
        self.bounded("list", self.store.list(limit)).await
    }

    /// Number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` / `Database` if the store fails.
    pub async fn count(&self) -> Result<usize> {
        self.bounded("count", self.store.count()).await
    }
}
