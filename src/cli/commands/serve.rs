//! Serve command implementation.

use std::net::SocketAddr;

use tracing::info;

use super::{open_service, runtime};
use crate::cli::CommandContext;
use crate::config::{load_config, resolve_metric, resolve_search_options};
use crate::embeddings::{create_embedding_provider, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::search::SearchService;
use crate::server;
use crate::store::MemoryVectorStore;

/// Run the HTTP API until interrupted.
///
/// With `memory`, documents live only for the life of the process.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound, or the
/// provider or store cannot be opened.
pub fn execute(host: &str, port: u16, memory: bool, ctx: &CommandContext) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("invalid address {host}:{port}: {e}")))?;

    let rt = runtime()?;
    rt.block_on(async {
        if memory {
            let config = load_config()?;
            let provider = create_embedding_provider(ctx.provider).await?;
            let info = provider.info();
            let metric = resolve_metric(ctx.metric, &config)?;
            let store = MemoryVectorStore::new(info.dimensions, metric);
            let service =
                SearchService::with_options(provider, store, resolve_search_options(&config)?);

            info!(provider = %info.name, dimensions = info.dimensions, %metric, "serving in-memory store");
            server::serve(service, addr).await?;
        } else {
            let service = open_service(ctx).await?;
            let info = service.provider_info();
            let documents = service.count().await?;
            info!(
                provider = %info.name,
                dimensions = info.dimensions,
                documents,
                "serving persistent store"
            );
            let service = server::serve(service, addr).await?;
            service.into_store().close()?;
        }
        Ok(())
    })
}
