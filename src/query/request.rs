//! Request boundary decoding
//!
//! Validates the decoded JSON request object in one pass: every top-level
//! key must be recognized and carry the expected shape, otherwise the
//! whole request fails with [`QueryError::BadRequestKey`]. Downstream
//! compilers only ever see the typed [`QueryRequest`].

use crate::query::ast::{FilterClause, OPERATOR_KEY};
use crate::query::error::{QueryError, QueryResult};
use serde_json::Value;

/// Recognized top-level request keys
pub const TABLE_NAME: &str = "table_name";
pub const SELECT: &str = "select";
pub const WHERE: &str = "where";
pub const GROUP_BY: &str = "groupby";
pub const SORT: &str = "sort";
pub const LIMIT: &str = "limit";

/// A decoded, shape-validated query request
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// Target collection
    pub table: String,
    /// Requested output fields (aggregate or plain)
    pub select: Option<Vec<String>>,
    /// Raw filter entries, in request order
    pub where_clauses: Option<Vec<FilterClause>>,
    /// Grouping fields
    pub group_by: Option<Vec<String>>,
    /// Ordering entries as (field, order token) pairs, in request order
    pub sort: Option<Vec<(String, String)>>,
    /// Row cap; zero means unlimited
    pub limit: Option<u64>,
}

/// Decode a raw request object into a [`QueryRequest`].
pub fn decode_request(raw: &Value) -> QueryResult<QueryRequest> {
    let obj = raw
        .as_object()
        .ok_or_else(|| QueryError::BadRequestKey("request".to_string()))?;

    let mut request = QueryRequest::default();
    let mut table = None;

    for (key, value) in obj {
        match key.as_str() {
            TABLE_NAME => {
                table = Some(
                    value
                        .as_str()
                        .ok_or_else(|| QueryError::BadRequestKey(TABLE_NAME.to_string()))?
                        .to_string(),
                );
            }
            SELECT => request.select = Some(decode_string_list(value, SELECT)?),
            WHERE => request.where_clauses = Some(decode_where(value)?),
            GROUP_BY => request.group_by = Some(decode_string_list(value, GROUP_BY)?),
            SORT => request.sort = Some(decode_sort(value)?),
            LIMIT => {
                request.limit = Some(
                    value
                        .as_u64()
                        .ok_or_else(|| QueryError::BadRequestKey(LIMIT.to_string()))?,
                );
            }
            other => return Err(QueryError::BadRequestKey(other.to_string())),
        }
    }

    request.table = table.ok_or_else(|| QueryError::BadRequestKey(TABLE_NAME.to_string()))?;
    Ok(request)
}

/// Decode an array-of-strings key
fn decode_string_list(value: &Value, key: &str) -> QueryResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| QueryError::BadRequestKey(key.to_string()))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| QueryError::BadRequestKey(key.to_string()))
        })
        .collect()
}

/// Decode the `where` list: single-key objects, each optionally carrying
/// an `operator` key
fn decode_where(value: &Value) -> QueryResult<Vec<FilterClause>> {
    let entries = value
        .as_array()
        .ok_or_else(|| QueryError::BadRequestKey(WHERE.to_string()))?;

    let mut clauses = Vec::with_capacity(entries.len());
    for entry in entries {
        let obj = entry
            .as_object()
            .ok_or_else(|| QueryError::BadRequestKey(WHERE.to_string()))?;

        let mut operator = None;
        let mut field_value: Option<(String, Value)> = None;
        for (key, val) in obj {
            if key == OPERATOR_KEY {
                operator = Some(
                    val.as_str()
                        .ok_or_else(|| QueryError::BadRequestKey(WHERE.to_string()))?
                        .to_string(),
                );
            } else if field_value.is_some() {
                // More than one filter field in a single entry
                return Err(QueryError::BadRequestKey(WHERE.to_string()));
            } else {
                field_value = Some((key.clone(), val.clone()));
            }
        }

        let (field, val) =
            field_value.ok_or_else(|| QueryError::BadRequestKey(WHERE.to_string()))?;
        clauses.push(FilterClause::new(field, operator, val));
    }
    Ok(clauses)
}

/// Decode the `sort` list: objects mapping field to an order token
fn decode_sort(value: &Value) -> QueryResult<Vec<(String, String)>> {
    let entries = value
        .as_array()
        .ok_or_else(|| QueryError::BadRequestKey(SORT.to_string()))?;

    let mut order = Vec::with_capacity(entries.len());
    for entry in entries {
        let obj = entry
            .as_object()
            .ok_or_else(|| QueryError::BadRequestKey(SORT.to_string()))?;
        for (field, token) in obj {
            let token = token
                .as_str()
                .ok_or_else(|| QueryError::BadRequestKey(SORT.to_string()))?;
            order.push((field.clone(), token.to_string()));
        }
    }
    Ok(order)
}
