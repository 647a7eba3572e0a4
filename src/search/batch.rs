//! Batch ingestion outcome.

use crate::error::Error;
use crate::model::Document;

/// One batch item that failed to ingest.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the item in the submitted batch.
    pub index: usize,
    pub error: Error,
}

/// Result of [`SearchService::ingest_batch`](super::SearchService::ingest_batch).
///
/// Ingestion is not transactional: documents in `succeeded` stay stored
/// whatever happens to later items. When a fatal error halts the batch,
/// the items after it are listed in `skipped` and never attempted.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<Document>,
    pub failed: Vec<BatchFailure>,
    pub skipped: Vec<usize>,
    pub halted: bool,
}

impl BatchReport {
    /// Whether every item was stored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// The earliest failure, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&Error> {
        self.failed.first().map(|f| &f.error)
    }

    /// Number of items the batch contained.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }
}
