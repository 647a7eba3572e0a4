//! API errors mapped to HTTP status codes.
//!
//! Every error body has the shape
//! `{"error": {"code": "...", "message": "...", "retryable": bool}}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{Error, ErrorCode};

/// Handler error wrapping the crate [`Error`].
///
/// - `InvalidArgument` → 400
/// - `DocumentNotFound` → 404
/// - `EmbeddingUnavailable`, `StoreUnavailable` → 503
/// - everything else → 500
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

/// HTTP status for a crate error.
#[must_use]
pub fn status_for(error: &Error) -> StatusCode {
    match error.error_code() {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::DocumentNotFound => StatusCode::NOT_FOUND,
        ErrorCode::EmbeddingUnavailable | ErrorCode::StoreUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON body describing an error.
#[must_use]
pub fn error_body(error: &Error) -> serde_json::Value {
    let code = error.error_code();
    json!({
        "code": code.as_str(),
        "message": error.to_string(),
        "retryable": code.is_retryable(),
    })
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidArgument(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::InvalidArgument(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        let body = Json(json!({ "error": error_body(&self.0) }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(Error::InvalidArgument("k".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(Error::DocumentNotFound { id: "x".into() }).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(Error::EmbeddingUnavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(Error::StoreUnavailable("slow".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(Error::DimensionMismatch { expected: 384, actual: 768 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = error_body(&Error::EmbeddingUnavailable("down".into()));
        assert_eq!(body["code"], "EMBEDDING_UNAVAILABLE");
        assert_eq!(body["retryable"], true);
        assert!(body["message"].as_str().unwrap().contains("down"));
    }
}
