//! Command implementations.

pub mod completions;
pub mod documents;
pub mod embeddings;
pub mod ingest;
pub mod search;
pub mod serve;
pub mod status;
pub mod version;

use std::path::PathBuf;

use tracing::debug;

use crate::cli::CommandContext;
use crate::config::{load_config, AppConfig, resolve_db_path, resolve_metric, resolve_search_options};
use crate::embeddings::{create_embedding_provider, BoxedProvider, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::search::SearchService;
use crate::store::{DistanceMetric, SqliteVectorStore};

/// Service over the on-disk store, as used by the writing and searching commands.
pub type CliService = SearchService<BoxedProvider, SqliteVectorStore>;

/// Create the tokio runtime a command runs on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Resolve the database path or fail with a config error.
pub(crate) fn db_path(ctx: &CommandContext) -> Result<PathBuf> {
    resolve_db_path(ctx.db.as_deref())
        .ok_or_else(|| Error::Config("could not determine a database path; pass --db".into()))
}

/// Metric for a store: the flag wins, then what the store already records,
/// then env/config/default.
fn store_metric(
    ctx: &CommandContext,
    config: &AppConfig,
    path: &std::path::Path,
) -> Result<DistanceMetric> {
    if ctx.metric.is_none() {
        if let Some(metric) = SqliteVectorStore::inspect(path)?.and_then(|s| s.metric) {
            return Ok(metric);
        }
    }
    resolve_metric(ctx.metric, config)
}

/// Build a provider and open the store sized to it.
pub(crate) async fn open_service(ctx: &CommandContext) -> Result<CliService> {
    let config = load_config()?;
    let provider = create_embedding_provider(ctx.provider).await?;
    let info = provider.info();
    let options = resolve_search_options(&config)?;

    let path = db_path(ctx)?;
    let metric = store_metric(ctx, &config, &path)?;
    debug!(
        provider = %info.name,
        model = %info.model,
        dimensions = info.dimensions,
        db = %path.display(),
        "opening search service"
    );

    let store = SqliteVectorStore::open(&path, info.dimensions, metric)?;
    Ok(SearchService::with_options(provider, store, options))
}

/// Open the existing store without an embedding provider.
pub(crate) fn open_existing_store(ctx: &CommandContext) -> Result<Option<SqliteVectorStore>> {
    let path = db_path(ctx)?;
    SqliteVectorStore::open_existing(&path)
}

/// Shorten text for table output.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("mug", 10), "mug");
        assert_eq!(truncate("ceramic coffee mug", 8), "ceramic…");
        assert_eq!(truncate("ééééé", 3).chars().count(), 3);
    }

    #[test]
    fn test_store_metric_prefers_flag_then_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let store = SqliteVectorStore::open(&path, 4, DistanceMetric::Cosine).unwrap();
        store.close().unwrap();

        let ctx = CommandContext {
            db: Some(path.clone()),
            ..CommandContext::default()
        };
        assert_eq!(store_metric(&ctx, &AppConfig::default(), &path).unwrap(), DistanceMetric::Cosine);

        let ctx = CommandContext {
            metric: Some(DistanceMetric::Euclidean),
            ..ctx
        };
        assert_eq!(store_metric(&ctx, &AppConfig::default(), &path).unwrap(), DistanceMetric::Euclidean);
    }
}
