//! Vector store layer.
//!
//! A store holds documents with fixed-dimension vectors and answers
//! nearest-neighbor queries with a single distance metric:
//!
//! - [`SqliteVectorStore`] - persistent, the default
//! - [`MemoryVectorStore`] - in-process, for tests and `serve --memory`
//!
//! Both ranks through [`distance::rank`].

pub mod distance;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use distance::{rank, DistanceMetric};
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{Error, Result};
use crate::model::{Document, MetadataFilter, ScoredDocument};
use std::future::Future;
use tokio::time::Instant;

/// Default page size for [`VectorStore::list`].
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Storage and nearest-neighbor retrieval of embedded documents.
pub trait VectorStore: Send + Sync {
    /// Dimensionality every stored vector has.
    fn dimensions(&self) -> usize;

    /// Metric the store ranks with.
    fn metric(&self) -> DistanceMetric;

    /// Persist a document.
    ///
    /// Fails with `DimensionMismatch` if the vector length differs from
    /// [`dimensions`](Self::dimensions).
    fn insert(&self, document: Document) -> impl Future<Output = Result<()>> + Send;

    /// Persist a document, giving up with `StoreUnavailable` at `deadline`.
    ///
    /// An error means the document was not stored. The default drops the
    /// pending [`insert`](Self::insert) at the deadline, which is only sound
    /// for stores whose inserts cannot outlive their future; stores that
    /// write on another thread override this.
    fn insert_before(
        &self,
        document: Document,
        deadline: Instant,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            tokio::time::timeout_at(deadline, self.insert(document))
                .await
                .map_err(|_| {
                    Error::StoreUnavailable("insert did not complete before its deadline".into())
                })?
        }
    }

    /// The `k` nearest documents to `vector` that pass `filter`.
    fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> impl Future<Output = Result<Vec<ScoredDocument>>> + Send;

    /// Fetch a document by id.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Documents in insertion order, at most `limit`.
    fn list(&self, limit: usize) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Number of stored documents.
    fn count(&self) -> impl Future<Output = Result<usize>> + Send;
}

/// Check a vector's length against the store's dimensionality and that
/// every component is finite.
pub(crate) fn check_vector(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidArgument(
            "vector components must be finite numbers".into(),
        ));
    }
    Ok(())
}
