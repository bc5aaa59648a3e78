//! # Flowquery
//!
//! A generic, JSON-described filter/aggregate query language over
//! time-series flow documents, compiled into backend aggregation
//! pipelines and executed in parallel across a pool of backend
//! connections.
//!
//! ## Features
//!
//! - **Typed compilation**: request shapes validated once at the
//!   boundary, tagged stage descriptors thereafter
//! - **Time-window planning**: relative-time resolution, mutual-exclusion
//!   validation, millisecond-exact window normalization
//! - **Chunked execution**: eligible scans split into contiguous
//!   sub-windows run concurrently, one task per pooled connection
//! - **Fail-fast semantics**: the first chunk failure cancels siblings
//!   and discards partial results
//!
//! ## Modules
//!
//! - [`query`]: request decoding, compilation, and parallel execution
//! - [`backend`]: the backend capability trait, registry, pool, and the
//!   in-memory reference backend
//! - [`config`]: explicit configuration, loaded from TOML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowquery::backend::{BackendRegistry, MemoryBackend};
//! use flowquery::config::Config;
//! use flowquery::query::QueryService;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let registry = BackendRegistry::with_defaults();
//!     let pool = registry.build_pool(&config.backend)?;
//!     pool.setup_all().await?;
//!
//!     let service = QueryService::new(pool, config.backend.split_enabled);
//!     let results = service
//!         .handle(&json!({
//!             "table_name": "ipfix_collection",
//!             "where": [{"start_time": "now-1d"}, {"end_time": "now"}],
//!         }))
//!         .await?;
//!
//!     println!("{} matching documents", results.len());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod query;

// Re-export top-level types for convenience
pub use backend::{Backend, BackendError, BackendRegistry, BackendResult, ConnectionPool, MemoryBackend};

pub use config::{BackendConfig, Config, ConfigError, LoggingConfig};

pub use query::{
    ChunkPlan, CompiledPipeline, ErrorPayload, ErrorStatus, FilterClause, QueryError,
    QueryExecutor, QueryPlan, QueryRequest, QueryService, StageDescriptor, TimeWindow,
};
