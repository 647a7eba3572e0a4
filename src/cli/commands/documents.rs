//! Read-only document commands: `get` and `list`.
//!
//! These open the store with the dimensionality it records and never
//! touch an embedding provider.

use colored::Colorize;
use serde::Serialize;

use super::{open_existing_store, runtime, truncate};
use crate::cli::CommandContext;
use crate::error::{Error, Result};
use crate::model::Document;
use crate::store::VectorStore;

#[derive(Serialize)]
struct ListOutput {
    documents: Vec<Document>,
    count: usize,
}

/// Execute `sfs get <id>`.
///
/// # Errors
///
/// Returns `DocumentNotFound` if the store is missing or has no such id.
pub fn get(id: &str, ctx: &CommandContext) -> Result<()> {
    let not_found = || Error::DocumentNotFound { id: id.to_string() };
    let store = open_existing_store(ctx)?.ok_or_else(not_found)?;

    let rt = runtime()?;
    let document = rt.block_on(store.get(id));
    store.close()?;
    let document = document?.ok_or_else(not_found)?.without_vector();

    if ctx.json {
        println!("{}", serde_json::to_string(&document)?);
    } else if crate::is_csv() {
        println!("id,text,created_at");
        println!(
            "{},{},{}",
            document.id,
            crate::csv_escape(&document.text),
            document.created_at
        );
    } else {
        println!("{}", document.id.bold());
        println!("{}", document.text);
        for (key, value) in &document.metadata {
            println!("  {} {value}", format!("{key}:").dimmed());
        }
    }

    Ok(())
}

/// Execute `sfs list`.
///
/// An uninitialized store lists as empty.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn list(limit: usize, ctx: &CommandContext) -> Result<()> {
    let documents = match open_existing_store(ctx)? {
        Some(store) => {
            let rt = runtime()?;
            let documents = rt.block_on(store.list(limit));
            store.close()?;
            documents?
                .into_iter()
                .map(|doc| doc.without_vector())
                .collect()
        }
        None => Vec::new(),
    };

    if ctx.json {
        let output = ListOutput {
            count: documents.len(),
            documents,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if crate::is_csv() {
        println!("id,text,created_at");
        for doc in &documents {
            println!("{},{},{}", doc.id, crate::csv_escape(&doc.text), doc.created_at);
        }
    } else if documents.is_empty() {
        println!("No documents.");
    } else {
        for doc in &documents {
            println!("{} {}", doc.id.dimmed(), truncate(&doc.text, 72));
        }
        println!();
        println!("{} document(s)", documents.len());
    }

    Ok(())
}
