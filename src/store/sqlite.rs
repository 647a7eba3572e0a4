//! SQLite vector store.
//!
//! Brute-force nearest-neighbor search over vectors kept as BLOBs. Every
//! query scans the table, filters metadata in process and ranks with
//! [`rank`](super::rank). That is plenty for a storefront catalog of tens
//! of thousands of products.
//!
//! The connection lives behind a mutex and all SQLite work runs on tokio's
//! blocking pool, so the async API never stalls a runtime worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::schema::{apply_schema, get_meta, set_meta, META_DIMENSIONS, META_METRIC};
use super::{check_vector, rank, DistanceMetric, VectorStore};
use crate::error::{Error, Result};
use crate::model::{check_metadata, Document, Metadata, MetadataFilter, ScoredDocument};

const DOCUMENT_COLUMNS: &str = "id, text, metadata, embedding, created_at";

// States of a deadline-bound write, shared with its blocking task.
const WRITE_PENDING: u8 = 0;
const WRITE_STARTED: u8 = 1;
const WRITE_ABANDONED: u8 = 2;

/// Persistent vector store backed by a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
    metric: DistanceMetric,
    path: Option<PathBuf>,
}

/// Settings and size of an existing store, read without opening it for writes.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub dimensions: Option<usize>,
    pub metric: Option<DistanceMetric>,
    pub documents: usize,
}

impl SqliteVectorStore {
    /// Open (or create) a store at the given path.
    ///
    /// A new store records `dimensions` and `metric`; an existing one must
    /// match them.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the store was created with another
    /// dimensionality, `Config` if with another metric, or a database error.
    pub fn open(path: &Path, dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        Self::open_with_timeout(path, dimensions, metric, None)
    }

    /// Open a store with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_timeout(
        path: &Path,
        dimensions: usize,
        metric: DistanceMetric,
        timeout_ms: Option<u64>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // Default 5 second timeout
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;

        let store = Self::init(conn, dimensions, metric, Some(path.to_path_buf()))?;
        info!(path = %path.display(), dimensions, metric = %metric, "opened vector store");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, dimensions, metric, None)
    }

    fn init(
        conn: Connection,
        dimensions: usize,
        metric: DistanceMetric,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Config("vector dimensionality must be at least 1".into()));
        }

        apply_schema(&conn)?;

        match get_meta(&conn, META_DIMENSIONS)? {
            Some(stored) => {
                let expected: usize = stored.parse().map_err(|_| {
                    Error::Config(format!("corrupt store_meta dimensions value '{stored}'"))
                })?;
                if expected != dimensions {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: dimensions,
                    });
                }
            }
            None => set_meta(&conn, META_DIMENSIONS, &dimensions.to_string())?,
        }

        match get_meta(&conn, META_METRIC)? {
            Some(stored) => {
                let recorded: DistanceMetric = stored.parse().map_err(Error::Config)?;
                if recorded != metric {
                    return Err(Error::Config(format!(
                        "store was created with the {recorded} metric, not {metric}"
                    )));
                }
            }
            None => set_meta(&conn, META_METRIC, metric.as_str())?,
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
            metric,
            path,
        })
    }

    /// Read the settings and document count of an existing store.
    ///
    /// Returns `None` if no database file exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn inspect(path: &Path) -> Result<Option<StoreStats>> {
        if !path.exists() {
            return Ok(None);
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let has_documents: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
                [],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !has_documents {
            return Ok(Some(StoreStats {
                dimensions: None,
                metric: None,
                documents: 0,
            }));
        }

        let documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(Some(StoreStats {
            dimensions: get_meta(&conn, META_DIMENSIONS)?.and_then(|v| v.parse().ok()),
            metric: get_meta(&conn, META_METRIC)?.and_then(|v| v.parse().ok()),
            documents: usize::try_from(documents).unwrap_or(0),
        }))
    }

    /// Open an existing store with the dimensionality and metric it records.
    ///
    /// Returns `None` if there is no initialized store at `path`. Read-only
    /// commands use this so they work without an embedding provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be opened.
    pub fn open_existing(path: &Path) -> Result<Option<Self>> {
        let Some(stats) = Self::inspect(path)? else {
            return Ok(None);
        };
        let (Some(dimensions), Some(metric)) = (stats.dimensions, stats.metric) else {
            return Ok(None);
        };
        Self::open(path, dimensions, metric).map(Some)
    }

    /// Path of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the store, flushing the connection.
    ///
    /// Clones of this store share the connection; it closes when the last
    /// one is closed or dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to close the connection.
    pub fn close(self) -> Result<()> {
        let Ok(mutex) = Arc::try_unwrap(self.conn) else {
            return Ok(());
        };
        let conn = mutex
            .into_inner()
            .map_err(|_| Error::StoreUnavailable("connection lock poisoned".into()))?;
        conn.close().map_err(|(_, e)| Error::Database(e))?;
        debug!("vector store closed");
        Ok(())
    }

    /// Run blocking SQLite work on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::StoreUnavailable("connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| Error::StoreUnavailable(format!("store task failed: {e}")))?
    }

    /// Like [`with_conn`](Self::with_conn), but `f` never starts after
    /// `deadline` has been reported as missed.
    ///
    /// The blocking task and the caller race on a shared state once the
    /// task holds the connection. If the caller wins, the task drops `f`
    /// unrun and the caller returns `StoreUnavailable`. If the task wins,
    /// the caller waits for `f` and returns its real outcome.
    async fn with_conn_until<T, F>(
        &self,
        deadline: Instant,
        operation: &'static str,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let state = Arc::new(AtomicU8::new(WRITE_PENDING));
        let task_state = Arc::clone(&state);

        let mut task = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::StoreUnavailable("connection lock poisoned".into()))?;
            if task_state
                .compare_exchange(WRITE_PENDING, WRITE_STARTED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(Error::StoreUnavailable(format!(
                    "{operation} abandoned after its deadline"
                )));
            }
            f(&guard)
        });

        let joined = match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                if state
                    .compare_exchange(WRITE_PENDING, WRITE_ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    warn!(operation, "store busy past deadline, write abandoned");
                    return Err(Error::StoreUnavailable(format!(
                        "{operation} could not start before its deadline"
                    )));
                }
                // Already running
                task.await
            }
        };
        joined.map_err(|e| Error::StoreUnavailable(format!("store task failed: {e}")))?
    }

    /// Validate and encode a document for the `documents` table.
    fn prepare(&self, document: Document) -> Result<PreparedDocument> {
        check_vector(self.dimensions, &document.vector)?;
        check_metadata(&document.metadata)?;

        let metadata = serde_json::to_string(&document.metadata)?;
        let blob = vector_to_blob(&document.vector);
        let dimensions = i64::try_from(document.vector.len())
            .map_err(|_| Error::InvalidArgument("vector too long".into()))?;

        Ok(PreparedDocument {
            id: document.id,
            text: document.text,
            metadata,
            blob,
            dimensions,
            created_at: document.created_at,
        })
    }
}

/// A document encoded as a `documents` row.
struct PreparedDocument {
    id: String,
    text: String,
    metadata: String,
    blob: Vec<u8>,
    dimensions: i64,
    created_at: i64,
}

fn insert_row(conn: &Connection, row: &PreparedDocument) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (id, text, metadata, embedding, dimensions, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            row.id,
            row.text,
            row.metadata,
            row.blob,
            row.dimensions,
            row.created_at
        ],
    )?;
    debug!(id = %row.id, "stored document");
    Ok(())
}

/// Encode a vector as a little-endian f32 BLOB.
fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 BLOB.
fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

/// Map a row selected with [`DOCUMENT_COLUMNS`].
fn map_document(row: &Row) -> rusqlite::Result<Document> {
    let metadata_json: String = row.get(2)?;
    let metadata: Metadata = serde_json::from_str(&metadata_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let blob: Vec<u8> = row.get(3)?;

    Ok(Document {
        id: row.get(0)?,
        text: row.get(1)?,
        metadata,
        vector: blob_to_vector(&blob),
        created_at: row.get(4)?,
    })
}

impl VectorStore for SqliteVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn insert(&self, document: Document) -> Result<()> {
        let row = self.prepare(document)?;
        self.with_conn(move |conn| insert_row(conn, &row)).await
    }

    async fn insert_before(&self, document: Document, deadline: Instant) -> Result<()> {
        let row = self.prepare(document)?;
        self.with_conn_until(deadline, "insert", move |conn| insert_row(conn, &row))
            .await
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>> {
        check_vector(self.dimensions, &vector)?;
        let metric = self.metric;

        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY seq"))?;
            let candidates = stmt
                .query_map([], map_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let scanned = candidates.len();

            let hits = rank(&vector, candidates, metric, k, filter.as_ref());
            debug!(scanned, returned = hits.len(), "brute-force query");
            Ok(hits)
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let document = conn
                .query_row(
                    &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                    [&id],
                    map_document,
                )
                .optional()?;
            Ok(document)
        })
        .await
    }

    async fn list(&self, limit: usize) -> Result<Vec<Document>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY seq LIMIT ?1"
            ))?;
            let documents = stmt
                .query_map([limit], map_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(documents)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetadataValue;
    use tempfile::TempDir;

    fn doc(text: &str, vector: Vec<f32>) -> Document {
        Document::new(text.to_string(), Metadata::new(), vector)
    }

    #[test]
    fn test_blob_roundtrip() {
        let vector = vec![0.25, -1.5, 3.0e-7, f32::MAX];
        let blob = vector_to_blob(&vector);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vector(&blob), vector);
    }

    #[tokio::test]
    async fn test_insert_get_and_count() {
        let store = SqliteVectorStore::open_memory(2, DistanceMetric::Euclidean).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("price".into(), MetadataValue::from(12.5));
        let document = Document::new("ceramic mug".into(), metadata, vec![0.5, 0.5]);
        let id = document.id.clone();
        store.insert(document).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.text, "ceramic mug");
        assert_eq!(fetched.vector, vec![0.5, 0.5]);
        assert_eq!(fetched.metadata.get("price"), Some(&MetadataValue::Float(12.5)));
        assert!(fetched.metadata.contains_key(crate::model::CREATED_AT_KEY));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_wrong_dimensions() {
        let store = SqliteVectorStore::open_memory(3, DistanceMetric::Euclidean).unwrap();
        let err = store.insert(doc("mug", vec![1.0])).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 1 }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_non_finite_values() {
        let store = SqliteVectorStore::open_memory(2, DistanceMetric::Euclidean).unwrap();
        store.insert(doc("mug", vec![1.0, 0.0])).await.unwrap();

        let mut metadata = Metadata::new();
        metadata.insert("price".into(), MetadataValue::Float(f64::NAN));
        let err = store
            .insert(Document::new("vase".into(), metadata, vec![0.0, 1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = store.insert(doc("pipe", vec![f32::NAN, 0.0])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // The store stays readable
        assert_eq!(store.list(10).await.unwrap().len(), 1);
        assert_eq!(store.query(vec![0.0, 0.0], 5, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_before_deadline_writes() {
        let store = SqliteVectorStore::open_memory(1, DistanceMetric::Euclidean).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        store.insert_before(doc("mug", vec![1.0]), deadline).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_past_deadline_is_not_written() {
        let store = SqliteVectorStore::open_memory(1, DistanceMetric::Euclidean).unwrap();
        let holder_store = store.clone();
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        // Keep the connection busy, as a long scan would
        let holder = std::thread::spawn(move || {
            let _guard = holder_store.conn.lock().unwrap();
            locked_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        });
        locked_rx.recv().unwrap();

        let deadline = Instant::now() + Duration::from_millis(20);
        let err = store
            .insert_before(doc("mug", vec![1.0]), deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));

        release_tx.send(()).unwrap();
        holder.join().unwrap();

        // The abandoned write never lands, even once the connection frees up
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_ranks_and_filters() {
        let store = SqliteVectorStore::open_memory(2, DistanceMetric::Euclidean).unwrap();
        let mut home = Metadata::new();
        home.insert("category".into(), MetadataValue::from("home"));

        store
            .insert(Document::new("mug".into(), home.clone(), vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert(Document::new("vase".into(), home.clone(), vec![3.0, 0.0]))
            .await
            .unwrap();
        store.insert(doc("pipe", vec![0.0, 0.0])).await.unwrap();

        let all = store.query(vec![0.0, 0.0], 10, None).await.unwrap();
        let texts: Vec<_> = all.iter().map(|h| h.document.text.as_str()).collect();
        assert_eq!(texts, vec!["pipe", "mug", "vase"]);

        let filtered = store
            .query(vec![0.0, 0.0], 10, Some(MetadataFilter::new(home)))
            .await
            .unwrap();
        let texts: Vec<_> = filtered.iter().map(|h| h.document.text.as_str()).collect();
        assert_eq!(texts, vec!["mug", "vase"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("catalog.db");

        let store = SqliteVectorStore::open(&path, 2, DistanceMetric::Cosine).unwrap();
        store.insert(doc("mug", vec![1.0, 0.0])).await.unwrap();
        store.close().unwrap();

        let store = SqliteVectorStore::open(&path, 2, DistanceMetric::Cosine).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.list(10).await.unwrap()[0].text, "mug");
    }

    #[tokio::test]
    async fn test_reopen_with_other_dimensions_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");

        SqliteVectorStore::open(&path, 384, DistanceMetric::Euclidean)
            .unwrap()
            .close()
            .unwrap();

        let err = SqliteVectorStore::open(&path, 768, DistanceMetric::Euclidean).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 384, actual: 768 }));
    }

    #[tokio::test]
    async fn test_reopen_with_other_metric_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");

        SqliteVectorStore::open(&path, 4, DistanceMetric::Euclidean)
            .unwrap()
            .close()
            .unwrap();

        let err = SqliteVectorStore::open(&path, 4, DistanceMetric::Cosine).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_inspect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        assert!(SqliteVectorStore::inspect(&path).unwrap().is_none());

        let store = SqliteVectorStore::open(&path, 2, DistanceMetric::Euclidean).unwrap();
        store.insert(doc("mug", vec![1.0, 0.0])).await.unwrap();
        store.close().unwrap();

        let stats = SqliteVectorStore::inspect(&path).unwrap().unwrap();
        assert_eq!(stats.dimensions, Some(2));
        assert_eq!(stats.metric, Some(DistanceMetric::Euclidean));
        assert_eq!(stats.documents, 1);

        let reopened = SqliteVectorStore::open_existing(&path).unwrap().unwrap();
        assert_eq!(reopened.dimensions(), 2);
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_respects_limit_and_order() {
        let store = SqliteVectorStore::open_memory(1, DistanceMetric::Euclidean).unwrap();
        for text in ["a", "b", "c"] {
            store.insert(doc(text, vec![1.0])).await.unwrap();
        }
        let listed = store.list(2).await.unwrap();
        let texts: Vec<_> = listed.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
