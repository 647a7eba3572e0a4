//! Storefront search - semantic product search over a local vector store
//!
//! This crate provides the core functionality for the `sfs` CLI tool and
//! its HTTP API.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Document, MetadataValue, MetadataFilter, SearchHit)
//! - [`embeddings`] - Embedding providers (Ollama, HuggingFace, Model2Vec, hashing)
//! - [`store`] - Vector stores (SQLite, in-memory) and distance ranking
//! - [`search`] - The search service tying a provider to a store
//! - [`server`] - axum HTTP API
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod model;
pub mod search;
pub mod server;
pub mod store;

pub use error::{Error, Result};

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Escape a value for CSV output (wrap in quotes if it contains commas, quotes, or newlines).
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
