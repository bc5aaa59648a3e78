//! In-memory document backend
//!
//! Interprets compiled pipelines over JSON documents held in process
//! memory. Pool handles built through [`MemoryBackend::pool`] share one
//! document store, the way pooled sessions share one server. This is the
//! default registry entry and the substrate the executor tests run on.

use crate::backend::{Backend, BackendResult, ConnectionPool};
use crate::query::{
    Comparator, GroupKey, MatchCondition, SortDirection, StageDescriptor, SumSpec, TimeWindow,
    TIMESTAMP_FIELD,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Store = Arc<RwLock<HashMap<String, Vec<Value>>>>;

/// Document store backend held entirely in memory
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Store,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool of `n` handles over one shared store
    pub fn pool(n: usize) -> BackendResult<ConnectionPool> {
        let shared = Self::new();
        let handles = (0..n.max(1))
            .map(|_| Arc::new(shared.clone()) as Arc<dyn Backend>)
            .collect();
        ConnectionPool::new(handles)
    }

    /// Insert one document into a collection
    pub async fn insert(&self, collection: &str, doc: Value) {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    /// Insert a batch of documents into a collection
    pub async fn insert_many(&self, collection: &str, docs: impl IntoIterator<Item = Value>) {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn setup(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        pipeline: &[StageDescriptor],
    ) -> BackendResult<Vec<Value>> {
        let mut docs = {
            let store = self.store.read().await;
            store.get(collection).cloned().unwrap_or_default()
        };
        for stage in pipeline {
            docs = apply_stage(docs, stage);
        }
        Ok(docs)
    }

    async fn count(&self, collection: &str) -> BackendResult<u64> {
        let store = self.store.read().await;
        Ok(store.get(collection).map_or(0, |docs| docs.len() as u64))
    }
}

fn apply_stage(docs: Vec<Value>, stage: &StageDescriptor) -> Vec<Value> {
    match stage {
        StageDescriptor::Match { criteria, window } => docs
            .into_iter()
            .filter(|doc| matches_criteria(doc, criteria) && matches_window(doc, window))
            .collect(),
        StageDescriptor::Group { keys, sums } => apply_group(docs, keys, sums),
        StageDescriptor::Project { fields } => docs
            .into_iter()
            .map(|doc| project_doc(&doc, fields))
            .collect(),
        StageDescriptor::Sort { order } => apply_sort(docs, order),
        StageDescriptor::Limit { limit } => {
            let mut docs = docs;
            docs.truncate(*limit as usize);
            docs
        }
    }
}

/// Walk a dotted path through nested objects
fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Order two scalar values when comparable: numbers numerically, strings
/// lexicographically
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}

fn comparator_holds(cmp: Comparator, ord: Ordering) -> bool {
    match cmp {
        Comparator::Gt => ord == Ordering::Greater,
        Comparator::Gte => ord != Ordering::Less,
        Comparator::Lt => ord == Ordering::Less,
        Comparator::Lte => ord != Ordering::Greater,
    }
}

fn matches_criteria(doc: &Value, criteria: &[(String, MatchCondition)]) -> bool {
    criteria.iter().all(|(field, cond)| {
        let Some(actual) = lookup_path(doc, field) else {
            return false;
        };
        match cond {
            MatchCondition::Equals(expected) => values_equal(actual, expected),
            MatchCondition::Range(bounds) => bounds.iter().all(|(cmp, bound)| {
                compare_values(actual, bound)
                    .is_some_and(|ord| comparator_holds(*cmp, ord))
            }),
        }
    })
}

fn matches_window(doc: &Value, window: &Option<TimeWindow>) -> bool {
    let Some(window) = window else {
        return true;
    };
    lookup_path(doc, TIMESTAMP_FIELD)
        .and_then(Value::as_i64)
        .is_some_and(|ts| ts >= window.start && ts <= window.end)
}

fn apply_group(docs: Vec<Value>, keys: &[GroupKey], sums: &[SumSpec]) -> Vec<Value> {
    // Serialized identity keeps group buckets hashable
    let mut buckets: HashMap<String, (Value, Vec<f64>)> = HashMap::new();

    for doc in &docs {
        let identity = if keys.is_empty() {
            json!(0)
        } else {
            let mut id = Map::new();
            for key in keys {
                let value = lookup_path(doc, &key.source).cloned().unwrap_or(Value::Null);
                id.insert(key.name.clone(), value);
            }
            Value::Object(id)
        };
        let bucket_key = identity.to_string();
        let (_, totals) = buckets
            .entry(bucket_key)
            .or_insert_with(|| (identity, vec![0.0; sums.len()]));
        for (i, sum) in sums.iter().enumerate() {
            if let Some(v) = lookup_path(doc, &sum.source).and_then(Value::as_f64) {
                totals[i] += v;
            }
        }
    }

    // Deterministic output order for an otherwise unordered grouping
    let mut entries: Vec<_> = buckets.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    entries
        .into_iter()
        .map(|(_, (identity, totals))| {
            let mut out = Map::new();
            out.insert("_id".to_string(), identity);
            for (sum, total) in sums.iter().zip(totals) {
                out.insert(sum.name.clone(), json!(total));
            }
            Value::Object(out)
        })
        .collect()
}

fn project_doc(doc: &Value, fields: &[String]) -> Value {
    // The store identity field is never projected out
    let mut out = Map::new();
    for field in fields {
        if let Some(value) = lookup_path(doc, field) {
            out.insert(field.clone(), value.clone());
        }
    }
    Value::Object(out)
}

fn apply_sort(mut docs: Vec<Value>, order: &[(String, SortDirection)]) -> Vec<Value> {
    docs.sort_by(|a, b| {
        for (field, dir) in order {
            let ord = match (lookup_path(a, field), lookup_path(b, field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ord = match dir {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    docs
}
