//! HTTP API.
//!
//! | Method | Path              | Body / query                         |
//! |--------|-------------------|--------------------------------------|
//! | POST   | `/documents/`     | `[{text, metadata}]` or `{documents}` |
//! | GET    | `/documents/`     | `?limit=N`                           |
//! | GET    | `/documents/{id}` |                                      |
//! | POST   | `/search/`        | `{query, k, filter_metadata}`        |
//! | GET    | `/health`         |                                      |

pub mod errors;
pub mod handlers;
pub mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::search::SearchService;
use crate::store::VectorStore;

pub use errors::ApiError;
pub use handlers::AppState;

/// Build the router over a shared service.
pub fn router<P, S>(service: AppState<P, S>) -> Router
where
    P: EmbeddingProvider + 'static,
    S: VectorStore + 'static,
{
    Router::new()
        .route(
            "/documents/",
            post(handlers::ingest_documents::<P, S>).get(handlers::list_documents::<P, S>),
        )
        .route("/documents/{id}", get(handlers::get_document::<P, S>))
        .route("/search/", post(handlers::search::<P, S>))
        .route("/health", get(handlers::health::<P, S>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serve until Ctrl+C or SIGTERM, then return the service.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn serve<P, S>(
    service: SearchService<P, S>,
    addr: SocketAddr,
) -> Result<SearchService<P, S>>
where
    P: EmbeddingProvider + 'static,
    S: VectorStore + 'static,
{
    let service = Arc::new(service);
    let app = router(Arc::clone(&service));

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Arc::try_unwrap(service).map_err(|_| {
        crate::error::Error::Other("service still referenced after shutdown".into())
    })
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{BoxedProvider, HashingProvider};
    use crate::store::{DistanceMetric, MemoryVectorStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const DIMS: usize = 64;

    fn app() -> Router {
        let service = SearchService::new(
            BoxedProvider::new(HashingProvider::new(DIMS)),
            MemoryVectorStore::new(DIMS, DistanceMetric::Euclidean),
        );
        router(Arc::new(service))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn seed(app: &Router) -> Value {
        let (status, body) = send(
            app,
            post_json(
                "/documents/",
                &json!([
                    {"text": "ceramic coffee mug with handle", "metadata": {"category": "kitchen"}},
                    {"text": "wireless bluetooth headphones", "metadata": {"category": "audio"}},
                    {"text": "cotton t-shirt in navy blue", "metadata": {"category": "apparel"}},
                ]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_ingest_returns_created_documents() {
        let app = app();
        let body = seed(&app).await;

        let documents = body["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 3);
        assert!(body["failed"].as_array().unwrap().is_empty());
        assert!(documents[0]["id"].is_string());
        assert!(documents[0].get("vector").is_none());
        assert!(documents[0]["metadata"]["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_ingest_accepts_wrapped_documents() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json("/documents/", &json!({"documents": [{"text": "steel water bottle"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_partial_failure_is_reported() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json(
                "/documents/",
                &json!([{"text": "leather wallet"}, {"text": "   "}]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["documents"].as_array().unwrap().len(), 1);
        assert_eq!(body["failed"][0]["index"], 1);
        assert_eq!(body["failed"][0]["error"]["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_ingest_malformed_body_is_bad_request() {
        let app = app();
        let (status, body) =
            send(&app, post_json("/documents/", &json!([{"metadata": {}}]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

        let request = Request::post("/documents/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_ranks_mug_first() {
        let app = app();
        seed(&app).await;

        let (status, body) = send(
            &app,
            post_json("/search/", &json!({"query": "coffee mug", "k": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let hits = body.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["text"], "ceramic coffee mug with handle");
        assert!(hits[0]["distance"].as_f64().unwrap() <= hits[1]["distance"].as_f64().unwrap());
        assert!(hits[0].get("vector").is_none());
    }

    #[tokio::test]
    async fn test_search_defaults_k_and_filters() {
        let app = app();
        seed(&app).await;

        let (status, body) = send(&app, post_json("/search/", &json!({"query": "shirt"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) = send(
            &app,
            post_json(
                "/search/",
                &json!({"query": "mug", "filter_metadata": {"category": "audio"}}),
            ),
        )
        .await;
        let hits = body.as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["metadata"]["category"], "audio");
    }

    #[tokio::test]
    async fn test_search_rejects_bad_k_and_blank_query() {
        let app = app();
        for k in [0, 101] {
            let (status, body) =
                send(&app, post_json("/search/", &json!({"query": "mug", "k": k}))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["retryable"], false);
        }
        let (status, _) = send(&app, post_json("/search/", &json!({"query": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_and_list_documents() {
        let app = app();
        let seeded = seed(&app).await;
        let id = seeded["documents"][1]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get(&format!("/documents/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "wireless bluetooth headphones");

        let (status, body) = send(&app, get("/documents/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "DOCUMENT_NOT_FOUND");

        let (status, body) = send(&app, get("/documents/?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["text"], "ceramic coffee mug with handle");
    }

    #[tokio::test]
    async fn test_health_reports_provider_and_count() {
        let app = app();
        seed(&app).await;

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "hashing");
        assert_eq!(body["dimensions"], DIMS);
        assert_eq!(body["metric"], "euclidean");
        assert_eq!(body["documents"], 3);
    }
}
