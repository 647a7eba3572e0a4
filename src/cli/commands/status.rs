//! Status command implementation.

use colored::Colorize;
use serde::Serialize;

use super::db_path;
use crate::cli::CommandContext;
use crate::config::{config_path, load_config, resolve_metric, resolve_search_options};
use crate::embeddings::resolve_provider_type;
use crate::error::Result;
use crate::store::{DistanceMetric, SqliteVectorStore};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    db_path: String,
    initialized: bool,
    dimensions: Option<usize>,
    metric: Option<DistanceMetric>,
    documents: usize,
    configured_provider: Option<String>,
    default_metric: DistanceMetric,
    embed_timeout_ms: u128,
    store_timeout_ms: u128,
    config_path: Option<String>,
}

/// Execute status command.
///
/// Reads the store read-only; no embedding provider is contacted.
///
/// # Errors
///
/// Returns an error if the config is invalid or the database unreadable.
pub fn execute(ctx: &CommandContext) -> Result<()> {
    let config = load_config()?;
    let path = db_path(ctx)?;
    let stats = SqliteVectorStore::inspect(&path)?;
    let options = resolve_search_options(&config)?;

    let output = StatusOutput {
        db_path: path.display().to_string(),
        initialized: stats.as_ref().is_some_and(|s| s.dimensions.is_some()),
        dimensions: stats.as_ref().and_then(|s| s.dimensions),
        metric: stats.as_ref().and_then(|s| s.metric),
        documents: stats.as_ref().map_or(0, |s| s.documents),
        configured_provider: ctx
            .provider
            .or_else(resolve_provider_type)
            .map(|p| p.to_string()),
        default_metric: resolve_metric(ctx.metric, &config)?,
        embed_timeout_ms: options.embed_timeout.as_millis(),
        store_timeout_ms: options.store_timeout.as_millis(),
        config_path: config_path().ok().map(|p| p.display().to_string()),
    };

    if ctx.json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Storefront Search Status".bold());
    println!("========================");
    println!();
    println!("Database:   {}", output.db_path);
    if output.initialized {
        println!("Documents:  {}", output.documents);
        if let Some(dimensions) = output.dimensions {
            println!("Dimensions: {dimensions}");
        }
        if let Some(metric) = output.metric {
            println!("Metric:     {metric}");
        }
    } else {
        println!("{}", "Not initialized (ingest a document to create it)".yellow());
        println!("Metric:     {} (for a new store)", output.default_metric);
    }
    println!();
    println!(
        "Provider:   {}",
        output.configured_provider.as_deref().unwrap_or("auto-detect")
    );
    println!(
        "Timeouts:   embed {}ms, store {}ms",
        output.embed_timeout_ms, output.store_timeout_ms
    );
    if let Some(ref path) = output.config_path {
        println!("Config:     {path}");
    }

    Ok(())
}
