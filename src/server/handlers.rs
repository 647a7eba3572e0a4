//! Route handlers.
//!
//! Each handler extracts its input, delegates to [`SearchService`] and maps
//! crate errors through [`ApiError`].

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::errors::{error_body, ApiError};
use super::models::{
    public, FailedItem, HealthResponse, IngestResponse, ListQuery, SearchRequest, MAX_K,
};
use crate::embeddings::EmbeddingProvider;
use crate::error::Error;
use crate::model::{ingest_items_from_json, metadata_from_json, Document, MetadataFilter, SearchHit};
use crate::search::SearchService;
use crate::store::{VectorStore, DEFAULT_LIST_LIMIT};

/// Shared handler state.
pub type AppState<P, S> = Arc<SearchService<P, S>>;

/// `POST /documents/`
///
/// Responds 201 with the stored documents and any per-item failures. When
/// nothing was stored and at least one item failed, the first failure
/// decides the status instead.
pub async fn ingest_documents<P, S>(
    State(service): State<AppState<P, S>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError>
where
    P: EmbeddingProvider,
    S: VectorStore,
{
    let Json(body) = payload?;
    let items = ingest_items_from_json(&body)?;

    let mut report = service.ingest_batch(items).await;
    if report.succeeded.is_empty() && !report.failed.is_empty() {
        let first = report.failed.remove(0);
        return Err(first.error.into());
    }

    let failed = report
        .failed
        .iter()
        .map(|f| FailedItem {
            index: f.index,
            error: error_body(&f.error),
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            documents: report.succeeded.into_iter().map(public).collect(),
            failed,
            skipped: report.skipped,
        }),
    ))
}

/// `POST /search/`
pub async fn search<P, S>(
    State(service): State<AppState<P, S>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<SearchHit>>, ApiError>
where
    P: EmbeddingProvider,
    S: VectorStore,
{
    let Json(request) = payload?;
    if !(1..=MAX_K).contains(&request.k) {
        return Err(Error::InvalidArgument(format!("k must be between 1 and {MAX_K}")).into());
    }

    let filter = request
        .filter_metadata
        .as_ref()
        .map(metadata_from_json)
        .transpose()?
        .map(MetadataFilter::new);

    let hits = service
        .search(&request.query, request.k, filter.as_ref())
        .await?;
    Ok(Json(hits.into_iter().map(SearchHit::from).collect()))
}

/// `GET /documents/{id}`
pub async fn get_document<P, S>(
    State(service): State<AppState<P, S>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError>
where
    P: EmbeddingProvider,
    S: VectorStore,
{
    let document = service.require(&id).await?;
    Ok(Json(public(document)))
}

/// `GET /documents/?limit=N`
pub async fn list_documents<P, S>(
    State(service): State<AppState<P, S>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Document>>, ApiError>
where
    P: EmbeddingProvider,
    S: VectorStore,
{
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let documents = service.list(limit).await?;
    Ok(Json(documents.into_iter().map(public).collect()))
}

/// `GET /health`
pub async fn health<P, S>(
    State(service): State<AppState<P, S>>,
) -> Result<Json<HealthResponse>, ApiError>
where
    P: EmbeddingProvider,
    S: VectorStore,
{
    let info = service.provider_info();
    let documents = service.count().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        provider: info.name,
        model: info.model,
        dimensions: info.dimensions,
        metric: service.metric(),
        documents,
    }))
}
