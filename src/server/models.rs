//! Request and response bodies.

use serde::{Deserialize, Serialize};

use crate::model::Document;
use crate::search::DEFAULT_K;
use crate::store::DistanceMetric;

/// Largest `k` a search request may ask for.
pub const MAX_K: usize = 100;

fn default_k() -> usize {
    DEFAULT_K
}

/// `POST /search/`
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub filter_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `GET /documents/?limit=N`
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// One item of a batch that was not stored.
#[derive(Debug, Serialize)]
pub struct FailedItem {
    pub index: usize,
    pub error: serde_json::Value,
}

/// `POST /documents/` response.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub documents: Vec<Document>,
    pub failed: Vec<FailedItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<usize>,
}

/// `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub metric: DistanceMetric,
    pub documents: usize,
}

/// Strip the vector before a document goes over the wire.
pub fn public(mut document: Document) -> Document {
    document.vector = Vec::new();
    document
}
