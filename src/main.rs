use std::sync::Arc;

use anyhow::Result;
use docascode::graph::GraphService;
use docascode::index::{DocumentIndexer, EmbeddingCache, OpenAiEmbedder};
use docascode::mcp::{HttpMcpServer, McpServer};
use docascode::seed::sample_underwriting_graph;
use docascode::Config;

/// Build a configured embedder with an optional LRU query-embedding cache.
/// Extracted to avoid duplicating this setup between serve and serve-http paths.
fn build_embedder(config: &Config) -> Result<Arc<OpenAiEmbedder>> {
    let api_key = std::env::var(&config.embeddings.api_key_env).map_err(|_| {
        anyhow::anyhow!(
            "Environment variable {} not set. Set it in your .env file or as an environment variable.",
            config.embeddings.api_key_env
        )
    })?;

    // Wrap in an LRU cache if cache_capacity > 0 (avoids re-embedding repeated queries)
    let cache = if config.embeddings.cache_capacity > 0 {
        Some(Arc::new(EmbeddingCache::new(config.embeddings.cache_capacity)))
    } else {
        None
    };

    Ok(Arc::new(OpenAiEmbedder::with_cache(
        api_key,
        config.embeddings.model.clone(),
        config.embeddings.dimensions,
        cache,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr; for MCP server mode stdout carries the protocol
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => {
            // MCP server mode (stdio transport)
            run_mcp_server().await?;
        }
        "serve-http" => {
            // HTTP server mode (for custom connectors)
            run_http_server().await?;
        }
        "seed" => {
            run_seed()?;
        }
        "verify" | _ => {
            // Default: verify configuration and storage
            run_verification().await?;
        }
    }

    Ok(())
}

/// Run MCP server (stdio transport)
async fn run_mcp_server() -> Result<()> {
    let config = Config::load()?;
    config.ensure_directories()?;
    let embedder = build_embedder(&config)?;

    let mut server = McpServer::new(config, embedder);
    server.run().await?;

    Ok(())
}

/// Run HTTP MCP server
async fn run_http_server() -> Result<()> {
    log::info!("Starting Docascode HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    config.ensure_directories()?;
    let embedder = build_embedder(&config)?;
    let port = config.http_server.port;

    let server = McpServer::new(config.clone(), embedder);
    let http_server = HttpMcpServer::new(server, &config)?;
    http_server.run(port).await?;

    Ok(())
}

/// Write the built-in sample graph into the configured graphs directory
fn run_seed() -> Result<()> {
    let config = Config::load()?;
    config.ensure_directories()?;

    let graphs = GraphService::new(config.graphs_dir());
    let path = graphs.write(&sample_underwriting_graph(), "mortgage_underwriting.json")?;
    log::info!("Seeded sample graph at {}", path.display());
    println!("Seeded sample graph at {}", path.display());

    Ok(())
}

/// Verify configuration and storage health
async fn run_verification() -> Result<()> {
    log::info!("Starting Docascode v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Graphs directory: {}", config.graphs_dir().display());
    log::info!("Templates directory: {}", config.templates_dir().display());
    log::info!("Index database: {}", config.index_db_path().display());
    log::info!("Embedding model: {}", config.embeddings.model);

    config.ensure_directories()?;

    // Graph files must parse and round-trip
    let graphs = GraphService::new(config.graphs_dir());
    let mut graph_count = 0usize;
    for entry in std::fs::read_dir(config.graphs_dir())? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".json") {
            continue;
        }
        match graphs.get_statistics(&name) {
            Ok(stats) => {
                graph_count += 1;
                log::info!(
                    "Graph {}: {} nodes, {} edges",
                    name,
                    stats.num_nodes,
                    stats.num_edges
                );
            }
            Err(e) => log::error!("Graph {} failed to load: {}", name, e),
        }
    }
    if graph_count == 0 {
        log::warn!("No graph files found; run `docascode seed` to create the sample graph");
    }

    // The index database must open and report statistics. A placeholder
    // embedder is enough here since nothing is embedded.
    let embedder = Arc::new(OpenAiEmbedder::new(
        String::new(),
        config.embeddings.model.clone(),
        config.embeddings.dimensions,
    ));
    let indexer = DocumentIndexer::open(config.index_db_path(), embedder, "documents").await?;
    let stats = indexer.statistics().await?;
    log::info!("Document index: {} documents", stats["total_documents"]);

    log::info!("Verification complete");
    Ok(())
}
