//! Request translation
//!
//! The entry point for one query request: decode the raw JSON object,
//! compile it into a plan, hand the plan to the executor, and return the
//! merged result list. Everything here is per-request; the only state
//! carried across requests is the connection pool inside the executor.

use crate::backend::ConnectionPool;
use crate::query::compiler::compile;
use crate::query::error::QueryResult;
use crate::query::executor::QueryExecutor;
use crate::query::request::decode_request;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

/// Translates raw query requests into executed plans
pub struct QueryService {
    executor: QueryExecutor,
    split_enabled: bool,
}

impl QueryService {
    /// Create a service over a pre-established pool. `split_enabled` is
    /// the global split-execution flag from configuration.
    pub fn new(pool: ConnectionPool, split_enabled: bool) -> Self {
        Self {
            executor: QueryExecutor::new(pool),
            split_enabled,
        }
    }

    /// Handle one decoded request end to end
    pub async fn handle(&self, raw: &Value) -> QueryResult<Vec<Value>> {
        let request_id = Uuid::new_v4();
        let request = decode_request(raw).inspect_err(|err| {
            error!(%request_id, error = %err, "request rejected at the boundary");
        })?;
        debug!(%request_id, table = %request.table, "decoded query request");

        let plan = compile(&request, self.executor.pool_size(), self.split_enabled)
            .inspect_err(|err| {
                error!(%request_id, error = %err, "query compilation failed");
            })?;

        self.executor.execute(&request.table, plan).await
    }
}
