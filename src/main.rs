//! Flowquery CLI
//!
//! Runs one query request against a configured backend pool: loads the
//! TOML configuration, optionally seeds the in-memory backend from an
//! NDJSON document file, executes the request, and prints the result
//! list (or the error payload with its status class).

use anyhow::{Context, Result};
use clap::Parser;
use flowquery::backend::{Backend, BackendRegistry, ConnectionPool, MemoryBackend};
use flowquery::config::Config;
use flowquery::query::{ErrorPayload, QueryService};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flowquery", version, about = "Filter/aggregate queries over time-series flow documents")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// NDJSON file of documents to seed into the memory backend
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Collection the seed documents belong to
    #[arg(long, default_value = "ipfix_collection")]
    collection: String,

    /// JSON query request file; "-" reads from stdin
    query: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    init_logging(&config);
    tracing::info!("Flowquery v{}", env!("CARGO_PKG_VERSION"));

    let backend = MemoryBackend::new();
    if let Some(path) = &args.seed {
        let count = seed_documents(&backend, &args.collection, path).await?;
        tracing::info!(count, collection = %args.collection, "seeded documents");
    }

    // The memory backend's pool handles must share the seeded store, so
    // its registry entry captures the instance built above
    let mut registry = BackendRegistry::with_defaults();
    let seeded = backend.clone();
    registry.register("memory", move |cfg| {
        let handles = (0..cfg.pool_size.max(1))
            .map(|_| Arc::new(seeded.clone()) as Arc<dyn Backend>)
            .collect();
        ConnectionPool::new(handles)
    });

    let pool = registry
        .build_pool(&config.backend)
        .context("building backend pool")?;
    pool.setup_all().await.context("backend setup")?;
    tracing::info!(
        kind = %config.backend.kind,
        pool_size = pool.len(),
        split_enabled = config.backend.split_enabled,
        "backend pool ready"
    );

    let request = read_request(&args.query)?;
    let service = QueryService::new(pool, config.backend.split_enabled);

    match service.handle(&request).await {
        Ok(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Err(err) => {
            let payload = ErrorPayload::new(&err);
            eprintln!(
                "{} ({})",
                serde_json::to_string(&payload)?,
                err.status()
            );
            std::process::exit(1);
        }
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Load NDJSON documents into the memory backend
async fn seed_documents(
    backend: &MemoryBackend,
    collection: &str,
    path: &PathBuf,
) -> Result<usize> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let mut count = 0;
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let doc = serde_json::from_str(line)
            .with_context(|| format!("seed file line {}", number + 1))?;
        backend.insert(collection, doc).await;
        count += 1;
    }
    Ok(count)
}

/// Read the query request from a file or stdin
fn read_request(path: &PathBuf) -> Result<serde_json::Value> {
    let contents = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading query from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading query file {}", path.display()))?
    };
    serde_json::from_str(&contents).context("query request is not valid JSON")
}
