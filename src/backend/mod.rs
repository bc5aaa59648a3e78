//! Backend capability layer
//!
//! The backing store sits behind the [`Backend`] trait: a small capability
//! interface (`setup`, `query`, `count`) that executes compiled pipelines.
//! Backends are selected through an explicit [`registry::BackendRegistry`]
//! built at startup, and a fixed [`pool::ConnectionPool`] of handles is
//! shared read-only across requests. Adding a backend means implementing
//! the trait and registering a constructor, never branching on name
//! strings.

mod memory;
mod pool;
mod registry;

pub use memory::MemoryBackend;
pub use pool::ConnectionPool;
pub use registry::BackendRegistry;

use crate::query::StageDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by backend implementations
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend kind has no registered constructor
    #[error("No backend registered for kind '{0}'")]
    UnknownKind(String),

    /// Connection/pool establishment failed
    #[error("Backend setup failed: {0}")]
    Setup(String),

    /// Pipeline execution failed
    #[error("{0}")]
    Query(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// A pre-established connection to the backing store.
///
/// Pipelines cross this seam as typed [`StageDescriptor`] slices; each
/// backend renders them into its native aggregation form.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Verify the handle is usable; called once at startup
    async fn setup(&self) -> BackendResult<()>;

    /// Execute an aggregation pipeline against a collection and return
    /// the matching documents. An empty pipeline returns the whole
    /// collection, unordered.
    async fn query(&self, collection: &str, pipeline: &[StageDescriptor])
        -> BackendResult<Vec<Value>>;

    /// Count the documents in a collection (diagnostics only)
    async fn count(&self, collection: &str) -> BackendResult<u64>;
}
