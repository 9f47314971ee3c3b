use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::QaError;
use crate::collector::{CollectStats, TopicCollector};
use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::index::load_index;
use crate::retrieval::{PlaceholderExtractor, Retriever};
use crate::server;
use crate::topics::save_topics;

/// Command-line overrides for `collect`
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub listing_url: Option<String>,
    pub output: Option<PathBuf>,
    pub no_browser: bool,
}

/// Command-line overrides for `serve`
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub bind: Option<String>,
    pub index: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
}

/// Collect every topic from the configured listing and write them to the topics file
#[inline]
pub async fn run_collect(config: &Config, options: CollectOptions) -> Result<CollectStats> {
    let mut collector_config = config.collector.clone();
    if let Some(listing_url) = options.listing_url {
        collector_config.listing_url = listing_url;
    }
    if let Some(output) = options.output {
        collector_config.output_path = output;
    }
    if options.no_browser {
        collector_config.enable_js_rendering = false;
    }

    let listing_url = collector_config.listing_url.clone();
    let output_path = collector_config.output_path.clone();

    let collector = TopicCollector::new(collector_config)?;
    let collection = collector.collect(&listing_url).await?;

    save_topics(&output_path, &collection.topics)
        .with_context(|| format!("Failed to save topics to {}", output_path.display()))?;
    info!(
        "Saved {} topics to {}",
        collection.topics.len(),
        output_path.display()
    );

    let stats = collection.stats;
    println!("Collection completed!");
    println!("  Topics discovered: {}", stats.discovered);
    println!("  Collected: {}", stats.collected);
    println!("  Skipped: {}", stats.failed);
    println!("  Duration: {:?}", stats.duration);
    println!("  Saved to: {}", output_path.display());

    Ok(stats)
}

/// Load the index, connect the Ollama embedder and wire up the retriever.
///
/// A missing or invalid index, or an index whose dimension differs from the
/// configured embedding dimension, is fatal.
#[inline]
pub fn build_retriever(
    config: &Config,
    index_path: &Path,
    metadata_path: &Path,
) -> crate::Result<Retriever> {
    let index = load_index(index_path, metadata_path)?;

    let expected = config.ollama.embedding_dimension as usize;
    if index.dimension() != expected {
        return Err(QaError::Index(format!(
            "index has dimension {} but model {} is configured for {}",
            index.dimension(),
            config.ollama.model,
            expected
        )));
    }

    let embedder = OllamaClient::new(&config.ollama)
        .map_err(|e| QaError::Embedding(format!("{:#}", e)))?;

    match embedder.health_check() {
        Ok(()) => info!("Ollama is reachable, using model {}", embedder.model()),
        Err(e) => warn!(
            "Ollama health check failed, queries will fail until it is available: {:#}",
            e
        ),
    }

    Ok(Retriever::new(
        index,
        Arc::new(embedder),
        Arc::new(PlaceholderExtractor),
    ))
}

/// Run the HTTP retriever until Ctrl-C
#[inline]
pub async fn serve_retriever(config: &Config, options: ServeOptions) -> crate::Result<()> {
    let mut server_config = config.server.clone();
    if let Some(bind) = options.bind {
        server_config.set_bind(bind)?;
    }
    let index_path = options.index.unwrap_or_else(|| server_config.index_path.clone());
    let metadata_path = options
        .metadata
        .unwrap_or_else(|| server_config.metadata_path.clone());

    let retriever = build_retriever(config, &index_path, &metadata_path)?;
    let app = server::router(Arc::new(retriever), server_config.max_body_bytes);

    let addr = server_config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| QaError::Server(format!("failed to bind {}: {}", addr, e)))?;

    server::serve(listener, app).await
}
