//! Search command implementation.

use colored::Colorize;
use serde::Serialize;

use super::{open_service, runtime, truncate};
use crate::cli::CommandContext;
use crate::error::{Error, Result};
use crate::model::{metadata_from_pairs, MetadataFilter, SearchHit};

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    k: usize,
    count: usize,
    results: Vec<SearchHit>,
}

/// Execute the search command.
///
/// # Errors
///
/// Returns `InvalidArgument` for a blank query, `k == 0` or a malformed
/// filter, and any embedding or store error from the search itself.
pub fn execute(query: &str, k: usize, filter: &[String], ctx: &CommandContext) -> Result<()> {
    let filter = MetadataFilter::new(metadata_from_pairs(filter)?);

    let rt = runtime()?;
    let results: Vec<SearchHit> = rt.block_on(async {
        let service = open_service(ctx).await?;
        let hits = service.search(query, k, Some(&filter)).await;
        service.into_store().close()?;
        Ok::<_, Error>(hits?.into_iter().map(SearchHit::from).collect())
    })?;

    if ctx.json {
        let output = SearchOutput {
            query,
            k,
            count: results.len(),
            results,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if crate::is_csv() {
        println!("rank,id,distance,text");
        for (rank, hit) in results.iter().enumerate() {
            println!(
                "{},{},{:.6},{}",
                rank + 1,
                hit.id,
                hit.distance,
                crate::csv_escape(&hit.text)
            );
        }
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching documents.");
        return Ok(());
    }

    for (rank, hit) in results.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{}.", rank + 1).bold(),
            truncate(&hit.text, 72),
            format!("({:.4})", hit.distance).dimmed()
        );
        let meta: Vec<String> = hit
            .metadata
            .iter()
            .filter(|(key, _)| key.as_str() != crate::model::CREATED_AT_KEY)
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if meta.is_empty() {
            println!("   {}", hit.id.dimmed());
        } else {
            println!("   {} {}", hit.id.dimmed(), meta.join(" ").cyan());
        }
    }

    Ok(())
}
