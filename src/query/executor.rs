//! Parallel query executor
//!
//! Runs compiled pipelines concurrently against pooled backend handles:
//! one task per pipeline, slot assigned round-robin. Each task fills its
//! own result buffer; buffers are merged in chunk order only after every
//! task has joined. The first failure aborts the remaining tasks and
//! discards any completed batches.

use crate::backend::{BackendError, ConnectionPool};
use crate::query::ast::{CompiledPipeline, StageDescriptor};
use crate::query::compiler::QueryPlan;
use crate::query::error::QueryResult;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Executes query plans against the connection pool
pub struct QueryExecutor {
    pool: ConnectionPool,
}

impl QueryExecutor {
    /// Create an executor over a pre-established pool
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Number of pooled handles, which also bounds the chunk count
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Execute a plan and return the merged result list
    pub async fn execute(&self, collection: &str, plan: QueryPlan) -> QueryResult<Vec<Value>> {
        match plan {
            QueryPlan::FullScan => self.full_scan(collection).await,
            QueryPlan::Pipelines(pipelines) => self.run_pipelines(collection, pipelines).await,
        }
    }

    /// Fetch the whole collection sorted ascending by timestamp, with a
    /// separate count purely for diagnostics
    async fn full_scan(&self, collection: &str) -> QueryResult<Vec<Value>> {
        let handle = self.pool.slot(0);
        let docs = handle
            .query(collection, &[StageDescriptor::sort_by_timestamp()])
            .await?;
        let count = handle.count(collection).await?;
        info!(collection, count, "full collection scan");
        Ok(docs)
    }

    async fn run_pipelines(
        &self,
        collection: &str,
        pipelines: Vec<CompiledPipeline>,
    ) -> QueryResult<Vec<Value>> {
        let total = pipelines.len();
        let mut tasks = JoinSet::new();
        for (index, pipeline) in pipelines.into_iter().enumerate() {
            let handle = self.pool.slot(index);
            let collection = collection.to_string();
            debug!(chunk = index, pipeline = %pipeline.render(), "dispatching chunk");
            tasks.spawn(async move {
                let batch = handle.query(&collection, &pipeline.stages).await;
                (index, batch)
            });
        }

        // One buffer per task; merged sequentially after the join so no
        // task ever writes shared state
        let mut batches: Vec<Option<Vec<Value>>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(batch))) => batches[index] = Some(batch),
                Ok((index, Err(err))) => {
                    error!(chunk = index, error = %err, "chunk query failed, aborting siblings");
                    tasks.abort_all();
                    return Err(err.into());
                }
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => {
                    tasks.abort_all();
                    return Err(BackendError::Query(join_err.to_string()).into());
                }
            }
        }

        let mut results = Vec::new();
        for batch in batches.into_iter().flatten() {
            results.extend(batch);
        }
        info!(collection, chunks = total, count = results.len(), "query responded");
        Ok(results)
    }
}
