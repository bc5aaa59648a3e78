//! Connection pool
//!
//! A fixed set of pre-established backend handles, created once at
//! startup and shared read-only across requests. Execution tasks are
//! assigned slots round-robin.

use crate::backend::{Backend, BackendError, BackendResult};
use std::sync::Arc;

/// Fixed-size pool of backend connection handles
#[derive(Clone)]
pub struct ConnectionPool {
    handles: Vec<Arc<dyn Backend>>,
}

impl ConnectionPool {
    /// Build a pool from pre-established handles; at least one is required.
    pub fn new(handles: Vec<Arc<dyn Backend>>) -> BackendResult<Self> {
        if handles.is_empty() {
            return Err(BackendError::Setup(
                "connection pool requires at least one handle".to_string(),
            ));
        }
        Ok(Self { handles })
    }

    /// Number of handles in the pool
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handle for task `index`. The planner produces at most `len()`
    /// pipelines, but the modulo keeps the lookup in bounds regardless of
    /// the caller.
    pub fn slot(&self, index: usize) -> Arc<dyn Backend> {
        Arc::clone(&self.handles[index % self.handles.len()])
    }

    /// Run setup on every handle
    pub async fn setup_all(&self) -> BackendResult<()> {
        for handle in &self.handles {
            handle.setup().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("len", &self.handles.len())
            .finish()
    }
}
