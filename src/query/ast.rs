//! Typed query model
//!
//! The request vocabulary (reserved field names), the filter-clause and
//! time-window types produced by the compilers, and the tagged stage
//! descriptors that make up a compiled pipeline. Shapes are validated once
//! at the request boundary; everything downstream operates on these types,
//! never on raw JSON maps.

use crate::query::error::{QueryError, QueryResult};
use serde_json::{json, Map, Value};

/// Reserved where-key naming the inclusive lower window bound
pub const START_TIME_KEY: &str = "start_time";
/// Reserved where-key naming the inclusive upper window bound
pub const END_TIME_KEY: &str = "end_time";
/// Backing timestamp field, used for native two-sided range filters and
/// for the implicit per-chunk ordering
pub const TIMESTAMP_FIELD: &str = "data.Timestamp";
/// Prefix marking an aggregate select key
pub const SUM_PREFIX: &str = "SUM(";
/// Key carrying the comparison operator inside a where entry
pub const OPERATOR_KEY: &str = "operator";

/// Comparison operators recognized in where clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparator {
    /// Map a request operator token to a comparator.
    ///
    /// Unrecognized tokens return `None`; the where-clause compiler then
    /// degrades the clause to an equality match.
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Render as the backend comparison key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    /// Whether this comparator constrains from below
    pub fn is_lower_bound(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte)
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw filter entry from the request's `where` list
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    /// Field the clause applies to
    pub field: String,
    /// Raw operator token, if the entry carried one
    pub operator: Option<String>,
    /// Raw comparison value
    pub value: Value,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: Option<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// An inclusive time window in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    /// Build a window, rejecting `start > end`. Violated windows are
    /// never silently swapped.
    pub fn new(start: i64, end: i64) -> QueryResult<Self> {
        if start > end {
            return Err(QueryError::InvalidTimeWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of whole milliseconds covered, both bounds inclusive
    pub fn span_ms(&self) -> i64 {
        self.end - self.start + 1
    }
}

/// Match condition for a single non-time field
#[derive(Debug, Clone, PartialEq)]
pub enum MatchCondition {
    /// Exact equality on the raw value
    Equals(Value),
    /// One- or two-sided range; at most one bound per direction
    Range(Vec<(Comparator, Value)>),
}

impl MatchCondition {
    fn render(&self) -> Value {
        match self {
            Self::Equals(v) => v.clone(),
            Self::Range(bounds) => {
                let mut doc = Map::new();
                for (cmp, v) in bounds {
                    doc.insert(cmp.as_str().to_string(), v.clone());
                }
                Value::Object(doc)
            }
        }
    }
}

/// Sort direction for one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parse the request order token
    pub fn from_order(order: &str) -> Option<Self> {
        match order {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }

    /// Render as the backend sort value (1 ascending, -1 descending)
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// One grouping key in a group stage
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKey {
    /// Output name (dots replaced with underscores)
    pub name: String,
    /// Source document field
    pub source: String,
}

/// One summed output in a group stage
#[derive(Debug, Clone, PartialEq)]
pub struct SumSpec {
    /// Output name derived from the aggregate select key
    pub name: String,
    /// Source document field being summed
    pub source: String,
}

/// A single pipeline stage, tagged by kind.
///
/// Non-match stages always appear in the fixed order Group, Project,
/// Sort, Limit regardless of request key order.
#[derive(Debug, Clone, PartialEq)]
pub enum StageDescriptor {
    /// Filter stage: non-time criteria plus an optional chunk window on
    /// the timestamp field
    Match {
        criteria: Vec<(String, MatchCondition)>,
        window: Option<TimeWindow>,
    },
    /// Grouped aggregation keyed by zero or more fields
    Group {
        keys: Vec<GroupKey>,
        sums: Vec<SumSpec>,
    },
    /// Projection to the named fields, always dropping the store identity
    /// field
    Project { fields: Vec<String> },
    /// Ordering over one or more keys
    Sort { order: Vec<(String, SortDirection)> },
    /// Row cap
    Limit { limit: u64 },
}

impl StageDescriptor {
    /// Ascending sort on the backing timestamp field, used for the
    /// chunker's implicit per-chunk ordering and the full-scan fallback
    pub fn sort_by_timestamp() -> Self {
        Self::Sort {
            order: vec![(TIMESTAMP_FIELD.to_string(), SortDirection::Ascending)],
        }
    }

    /// Render the stage as a backend aggregation document.
    ///
    /// Used for logging and by backends that speak document pipelines
    /// natively.
    pub fn render(&self) -> Value {
        match self {
            Self::Match { criteria, window } => {
                let mut doc = Map::new();
                for (field, cond) in criteria {
                    doc.insert(field.clone(), cond.render());
                }
                if let Some(w) = window {
                    doc.insert(
                        TIMESTAMP_FIELD.to_string(),
                        json!({ "$gte": w.start, "$lte": w.end }),
                    );
                }
                json!({ "$match": doc })
            }
            Self::Group { keys, sums } => {
                let mut doc = Map::new();
                if keys.is_empty() {
                    doc.insert("_id".to_string(), json!(0));
                } else {
                    let mut id = Map::new();
                    for key in keys {
                        id.insert(key.name.clone(), json!(format!("${}", key.source)));
                    }
                    doc.insert("_id".to_string(), Value::Object(id));
                }
                for sum in sums {
                    doc.insert(
                        sum.name.clone(),
                        json!({ "$sum": format!("${}", sum.source) }),
                    );
                }
                json!({ "$group": doc })
            }
            Self::Project { fields } => {
                let mut doc = Map::new();
                for field in fields {
                    doc.insert(field.clone(), json!(1));
                }
                // The store-generated identity field is of no use to callers
                doc.insert("_id".to_string(), json!(0));
                json!({ "$project": doc })
            }
            Self::Sort { order } => {
                let mut doc = Map::new();
                for (field, dir) in order {
                    doc.insert(field.clone(), json!(dir.as_i64()));
                }
                json!({ "$sort": doc })
            }
            Self::Limit { limit } => json!({ "$limit": limit }),
        }
    }
}

/// Ordered chunk windows for one request: length 1 when unsplit,
/// otherwise equal to the connection pool size
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    pub windows: Vec<TimeWindow>,
}

impl ChunkPlan {
    pub fn single(window: TimeWindow) -> Self {
        Self {
            windows: vec![window],
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// One executable pipeline: a match stage for its chunk followed by the
/// shared stage sequence
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub stages: Vec<StageDescriptor>,
}

impl CompiledPipeline {
    pub fn new(stages: Vec<StageDescriptor>) -> Self {
        Self { stages }
    }

    /// Render the whole pipeline as a document array
    pub fn render(&self) -> Value {
        Value::Array(self.stages.iter().map(StageDescriptor::render).collect())
    }
}
