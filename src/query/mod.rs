//! Flowquery query engine
//!
//! Compiles JSON-described filter/aggregate requests into backend
//! aggregation pipelines and executes them, optionally split across the
//! connection pool:
//!
//! - **Request**: boundary decode of the raw JSON object
//! - **Time**: relative `now-N<unit>` token resolution
//! - **Compiler**: where/select/sort/limit compilation, time-range
//!   chunking, pipeline assembly
//! - **Executor**: parallel per-chunk execution with fail-fast merging
//! - **Translator**: the per-request entry point
//!
//! # Request shape
//!
//! ```text
//! {
//!   "table_name": "ipfix_collection",
//!   "select":    ["data.AgentID"] | ["SUM(data.DataSets.octetDeltaCount)"],
//!   "where":     [{"start_time": "now-1d"}, {"end_time": "now"}, ...],
//!   "groupby":   ["data.AgentID"],
//!   "sort":      [{"data.Timestamp": "asc"}],
//!   "limit":     100
//! }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use flowquery::backend::MemoryBackend;
//! use flowquery::query::QueryService;
//!
//! let pool = MemoryBackend::pool(4)?;
//! let service = QueryService::new(pool, true);
//! let results = service.handle(&request_json).await?;
//! ```

mod ast;
mod compiler;
mod error;
mod executor;
mod request;
mod time;
mod translator;

pub use ast::{
    ChunkPlan, Comparator, CompiledPipeline, FilterClause, GroupKey, MatchCondition,
    SortDirection, StageDescriptor, SumSpec, TimeWindow, END_TIME_KEY, OPERATOR_KEY,
    START_TIME_KEY, SUM_PREFIX, TIMESTAMP_FIELD,
};
pub use compiler::{compile, QueryPlan};
pub use error::{ErrorBody, ErrorPayload, ErrorStatus, QueryError, QueryResult, TimeBound};
pub use executor::QueryExecutor;
pub use request::{decode_request, QueryRequest};
pub use time::{resolve_time_token, NOW_PREFIX};
pub use translator::QueryService;
