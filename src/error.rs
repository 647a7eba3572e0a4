//! Error types for storefront search.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=store, 3=not_found, 4=validation, etc.)
//! - Retryability flags for transient infrastructure failures
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Variants name the stage that failed so callers can tell an embedding
//! failure apart from a storage failure.

use thiserror::Error;

/// Result type alias for storefront search operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Clients match on the string; shell scripts on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Store (exit 2)
    StoreUnavailable,
    DatabaseError,

    // Not Found (exit 3)
    DocumentNotFound,

    // Validation (exit 4)
    InvalidArgument,

    // Config (exit 7)
    DimensionMismatch,
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Embedding (exit 9)
    EmbeddingUnavailable,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DimensionMismatch => "DIMENSION_MISMATCH",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::EmbeddingUnavailable => "EMBEDDING_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::StoreUnavailable | Self::DatabaseError => 2,
            Self::DocumentNotFound => 3,
            Self::InvalidArgument => 4,
            Self::DimensionMismatch | Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::EmbeddingUnavailable => 9,
        }
    }

    /// Whether the failure is transient and safe to retry with backoff.
    ///
    /// Caller errors and configuration errors are never retryable:
    /// repeating the same request cannot succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUnavailable | Self::StoreUnavailable | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in storefront search operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            Self::EmbeddingUnavailable(_) => ErrorCode::EmbeddingUnavailable,
            Self::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            Self::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Whether this error is fatal for an ingestion run.
    ///
    /// A dimension mismatch means provider and store disagree; every
    /// following item would fail the same way.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. } | Self::Config(_))
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::DocumentNotFound { id } => Some(format!(
                "No document with ID '{id}'. Use `sfs list` to see stored documents."
            )),

            Self::EmbeddingUnavailable(_) => Some(
                "Check the provider with `sfs embeddings status`.\n  \
                 Ollama:      ollama serve && ollama pull all-minilm\n  \
                 HuggingFace: export HF_TOKEN=...\n  \
                 Offline:     sfs --provider hashing ..."
                    .to_string(),
            ),

            Self::StoreUnavailable(_) => Some(
                "The vector store did not respond in time. Retry, or raise SFS_STORE_TIMEOUT_MS."
                    .to_string(),
            ),

            Self::DimensionMismatch { expected, actual } => Some(format!(
                "The store was created with {expected}-dimensional vectors but the provider \
                 produces {actual}. Use the original embedding model, or re-ingest every \
                 document into a new database (--db)."
            )),

            Self::InvalidArgument(msg) => {
                if msg.contains("metadata") || msg.contains("filter") {
                    Some(
                        "Metadata values must be strings, numbers or booleans. \
                         On the command line use key=value (e.g. --filter category=home)."
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) | Self::Other(_) => {
                None
            }
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(Error::EmbeddingUnavailable("down".into()).error_code().is_retryable());
        assert!(Error::StoreUnavailable("timeout".into()).error_code().is_retryable());
        assert!(!Error::InvalidArgument("k".into()).error_code().is_retryable());
        assert!(
            !Error::DimensionMismatch { expected: 384, actual: 768 }
                .error_code()
                .is_retryable()
        );
    }

    #[test]
    fn test_exit_codes_by_stage() {
        assert_eq!(Error::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(Error::StoreUnavailable("x".into()).exit_code(), 2);
        assert_eq!(Error::EmbeddingUnavailable("x".into()).exit_code(), 9);
        assert_eq!(Error::DimensionMismatch { expected: 1, actual: 2 }.exit_code(), 7);
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        assert!(Error::DimensionMismatch { expected: 384, actual: 256 }.is_fatal());
        assert!(!Error::InvalidArgument("empty".into()).is_fatal());
        assert!(!Error::EmbeddingUnavailable("down".into()).is_fatal());
    }

    #[test]
    fn test_structured_json_shape() {
        let err = Error::DocumentNotFound { id: "abc".into() };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "DOCUMENT_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("sfs list"));
    }
}
