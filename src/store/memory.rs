//! In-process vector store.

use std::sync::RwLock;

use tracing::debug;

use super::{check_vector, rank, DistanceMetric, VectorStore};
use crate::error::{Error, Result};
use crate::model::{check_metadata, Document, MetadataFilter, ScoredDocument};

/// Vector store held entirely in memory.
///
/// Documents live in a `Vec` in insertion order, which doubles as the
/// final ranking tie-break. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimensions: usize,
    metric: DistanceMetric,
    documents: RwLock<Vec<Document>>,
}

impl MemoryVectorStore {
    #[must_use]
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Self {
        Self {
            dimensions,
            metric,
            documents: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Document>>> {
        self.documents
            .read()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".into()))
    }
}

impl VectorStore for MemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn insert(&self, document: Document) -> Result<()> {
        check_vector(self.dimensions, &document.vector)?;
        check_metadata(&document.metadata)?;

        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".into()))?;
        if documents.iter().any(|d| d.id == document.id) {
            return Err(Error::InvalidArgument(format!(
                "document id '{}' already exists",
                document.id
            )));
        }
        debug!(id = %document.id, "memory store insert");
        documents.push(document);
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>> {
        check_vector(self.dimensions, &vector)?;
        let documents = self.read()?;
        Ok(rank(
            &vector,
            documents.iter().cloned(),
            self.metric,
            k,
            filter.as_ref(),
        ))
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.iter().find(|d| d.id == id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Document>> {
        Ok(self.read()?.iter().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, MetadataValue};

    fn doc(text: &str, vector: Vec<f32>) -> Document {
        Document::new(text.to_string(), Metadata::new(), vector)
    }

    #[tokio::test]
    async fn test_insert_and_query() {
        let store = MemoryVectorStore::new(2, DistanceMetric::Euclidean);
        store.insert(doc("a", vec![1.0, 0.0])).await.unwrap();
        store.insert(doc("b", vec![0.0, 1.0])).await.unwrap();

        let hits = store.query(vec![0.9, 0.1], 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.text, "a");
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_wrong_dimensions() {
        let store = MemoryVectorStore::new(3, DistanceMetric::Euclidean);
        let err = store.insert(doc("a", vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_non_finite_values() {
        let store = MemoryVectorStore::new(1, DistanceMetric::Euclidean);
        let mut metadata = Metadata::new();
        metadata.insert("price".into(), MetadataValue::Float(f64::INFINITY));
        assert!(store
            .insert(Document::new("mug".into(), metadata, vec![1.0]))
            .await
            .is_err());
        assert!(store.insert(doc("vase", vec![f32::NAN])).await.is_err());
        assert!(store.query(vec![f32::NAN], 1, None).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_before_uses_default_deadline() {
        let store = MemoryVectorStore::new(1, DistanceMetric::Euclidean);
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
        store.insert_before(doc("a", vec![1.0]), deadline).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_query() {
        let store = MemoryVectorStore::new(2, DistanceMetric::Cosine);
        assert!(store.query(vec![1.0, 0.0], 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_list_in_insertion_order() {
        let store = MemoryVectorStore::new(1, DistanceMetric::Euclidean);
        let first = doc("first", vec![1.0]);
        let id = first.id.clone();
        store.insert(first).await.unwrap();
        store.insert(doc("second", vec![2.0])).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap().unwrap().text, "first");
        assert!(store.get("missing").await.unwrap().is_none());

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].text, "first");
        assert_eq!(store.list(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_with_filter() {
        let store = MemoryVectorStore::new(1, DistanceMetric::Euclidean);
        let mut home = Metadata::new();
        home.insert("category".into(), MetadataValue::from("home"));
        store
            .insert(Document::new("mug".into(), home.clone(), vec![5.0]))
            .await
            .unwrap();
        store.insert(doc("pipe", vec![0.0])).await.unwrap();

        let hits = store
            .query(vec![0.0], 10, Some(MetadataFilter::new(home)))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.text, "mug");
    }
}
