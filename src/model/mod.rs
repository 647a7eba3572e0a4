//! Data models for storefront search.
//!
//! - Document (text + metadata + vector + timestamp)
//! - MetadataValue / MetadataFilter
//! - ScoredDocument / SearchHit (search results)
//! - IngestItem (ingestion input)

pub mod document;

pub use document::{
    check_metadata, ingest_items_from_json, metadata_from_json, metadata_from_pairs, Document, IngestItem,
    Metadata, MetadataFilter, MetadataValue, ScoredDocument, SearchHit, CREATED_AT_KEY,
};
