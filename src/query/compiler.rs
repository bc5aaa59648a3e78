//! Query compilation
//!
//! Turns a decoded [`QueryRequest`] into an executable [`QueryPlan`]:
//! the where-clause compiler resolves the time window and non-time match
//! criteria, the select/sort/limit compilers build the shared stage
//! descriptors, the chunker partitions the window for parallel execution,
//! and the assembler stitches one pipeline per chunk.
//!
//! ```text
//! QueryRequest -> where/select/sort/limit -> chunker -> assembler -> QueryPlan
//! ```

use crate::query::ast::{
    ChunkPlan, Comparator, CompiledPipeline, FilterClause, GroupKey, MatchCondition,
    SortDirection, StageDescriptor, SumSpec, TimeWindow, END_TIME_KEY, START_TIME_KEY,
    SUM_PREFIX, TIMESTAMP_FIELD,
};
use crate::query::error::{QueryError, QueryResult, TimeBound};
use crate::query::request::QueryRequest;
use crate::query::time::{resolve_time_token, NOW_PREFIX};
use serde_json::Value;
use tracing::debug;

/// Executable plan for one request
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    /// No where clauses were supplied: fetch the whole collection sorted
    /// ascending by timestamp
    FullScan,
    /// One compiled pipeline per chunk
    Pipelines(Vec<CompiledPipeline>),
}

/// Output of the where-clause compiler
#[derive(Debug, Clone, PartialEq)]
struct WhereOutcome {
    /// Resolved inclusive time window, when the request constrained time
    window: Option<TimeWindow>,
    /// Match criteria for all non-time fields, in request order
    criteria: Vec<(String, MatchCondition)>,
}

/// Compile a request into a plan.
///
/// `pool_size` bounds the chunk count; `split_enabled` is the global
/// split-execution flag. Both come from configuration, never from
/// process-wide state.
pub fn compile(
    request: &QueryRequest,
    pool_size: usize,
    split_enabled: bool,
) -> QueryResult<QueryPlan> {
    let (agg_keys, plain_keys) = split_select(request.select.as_deref())?;
    let group = build_group(&agg_keys, request.group_by.as_deref())?;
    debug!(?group, "compiled groupby clause");
    let project = build_project(&plain_keys);
    debug!(?project, "compiled select clause");
    let (sort, time_sort_present) = build_sort(request.sort.as_deref())?;
    debug!(?sort, time_sort_present, "compiled sort clause");
    let limit = build_limit(request.limit);
    debug!(?limit, "compiled limit clause");

    let Some(outcome) = compile_where(request.where_clauses.as_deref())? else {
        debug!("no where clauses supplied, falling back to full scan");
        return Ok(QueryPlan::FullScan);
    };

    // A per-chunk row cap would change the result set, and aggregates
    // cannot be merged across chunks without a second pass.
    let split = split_enabled && agg_keys.is_empty() && limit.is_none();

    let chunks = match outcome.window {
        Some(window) if split => chunk_windows(window, pool_size),
        Some(window) => ChunkPlan::single(window),
        None => ChunkPlan { windows: vec![] },
    };
    debug!(chunk_count = chunks.len(), "planned chunks");

    let mut pipelines = Vec::with_capacity(chunks.len().max(1));
    if chunks.is_empty() {
        pipelines.push(assemble(
            Some(&outcome.criteria),
            None,
            time_sort_present,
            &group,
            &project,
            &sort,
            &limit,
        ));
    } else {
        for window in &chunks.windows {
            pipelines.push(assemble(
                Some(&outcome.criteria),
                Some(*window),
                time_sort_present,
                &group,
                &project,
                &sort,
                &limit,
            ));
        }
    }
    Ok(QueryPlan::Pipelines(pipelines))
}

/// Assemble one pipeline: the chunk's match stage, the implicit
/// per-chunk timestamp ordering, then the shared stages in fixed order.
fn assemble(
    criteria: Option<&[(String, MatchCondition)]>,
    window: Option<TimeWindow>,
    time_sort_present: bool,
    group: &Option<StageDescriptor>,
    project: &Option<StageDescriptor>,
    sort: &Option<StageDescriptor>,
    limit: &Option<StageDescriptor>,
) -> CompiledPipeline {
    let mut stages = Vec::new();
    let criteria = criteria.unwrap_or(&[]);
    if !criteria.is_empty() || window.is_some() {
        stages.push(StageDescriptor::Match {
            criteria: criteria.to_vec(),
            window,
        });
    }
    if !time_sort_present {
        stages.push(StageDescriptor::sort_by_timestamp());
    }
    for stage in [group, project, sort, limit].into_iter().flatten() {
        stages.push(stage.clone());
    }
    CompiledPipeline::new(stages)
}

/// Compile the where clauses into a resolved window plus non-time match
/// criteria. Returns `None` when no clauses were supplied at all; the
/// caller then takes the full-scan fallback.
fn compile_where(clauses: Option<&[FilterClause]>) -> QueryResult<Option<WhereOutcome>> {
    let clauses = match clauses {
        Some(c) if !c.is_empty() => c,
        _ => return Ok(None),
    };

    // Group by field, preserving first-seen order; a field carries at
    // most two clauses (a two-sided range), extras are ignored
    let mut grouped: Vec<(&str, Vec<&FilterClause>)> = Vec::new();
    for clause in clauses {
        match grouped.iter_mut().find(|(field, _)| *field == clause.field) {
            Some((_, list)) => list.push(clause),
            None => grouped.push((&clause.field, vec![clause])),
        }
    }

    let mut start_time = None;
    let mut end_time = None;
    let mut timestamp_clauses: Vec<&FilterClause> = Vec::new();
    let mut criteria = Vec::new();

    for (field, entries) in &grouped {
        match *field {
            START_TIME_KEY => start_time = Some(&entries[0].value),
            END_TIME_KEY => end_time = Some(&entries[0].value),
            TIMESTAMP_FIELD => timestamp_clauses.extend(entries.iter().copied()),
            _ => criteria.push(((*field).to_string(), build_condition(entries))),
        }
    }

    let bound_keys_present = start_time.is_some() || end_time.is_some();
    if bound_keys_present && !timestamp_clauses.is_empty() {
        return Err(QueryError::AmbiguousTimeWindow);
    }

    let window = if let Some(start) = start_time {
        Some(resolve_bound_keys(start, end_time)?)
    } else if !timestamp_clauses.is_empty() {
        Some(resolve_timestamp_clauses(&timestamp_clauses)?)
    } else {
        // end_time without start_time constrains nothing; a window needs
        // its lower bound
        None
    };

    Ok(Some(WhereOutcome { window, criteria }))
}

/// Build the match condition for one non-time field.
///
/// Unrecognized operators degrade to an equality match on the raw value.
fn build_condition(entries: &[&FilterClause]) -> MatchCondition {
    let first = entries[0];
    let second = entries.get(1);
    let cmp1 = first
        .operator
        .as_deref()
        .and_then(Comparator::from_operator);
    let cmp2 = second.and_then(|c| c.operator.as_deref().and_then(Comparator::from_operator));

    let mut bounds = Vec::new();
    if let Some(cmp) = cmp1 {
        bounds.push((cmp, first.value.clone()));
    }
    if let (Some(cmp), Some(clause)) = (cmp2, second) {
        bounds.push((cmp, clause.value.clone()));
    }
    if bounds.is_empty() {
        MatchCondition::Equals(first.value.clone())
    } else {
        MatchCondition::Range(bounds)
    }
}

/// Resolve the `start_time`/`end_time` form. A missing end defaults to
/// "now"; both bounds are already inclusive, so no shifting applies.
fn resolve_bound_keys(start: &Value, end: Option<&Value>) -> QueryResult<TimeWindow> {
    let start_ms = resolve_time_value(start)?;
    let end_ms = match end {
        Some(v) => resolve_time_value(v)?,
        None => resolve_time_token(NOW_PREFIX)?,
    };
    TimeWindow::new(start_ms, end_ms)
}

/// Resolve one `start_time`/`end_time` value: JSON numbers are absolute
/// epoch ms, strings with the `now` prefix are relative tokens.
fn resolve_time_value(value: &Value) -> QueryResult<i64> {
    if let Some(ms) = value.as_i64() {
        return Ok(ms);
    }
    match value.as_str() {
        Some(s) if s.starts_with(NOW_PREFIX) => resolve_time_token(s),
        Some(s) => Err(QueryError::InvalidTimeFormat(s.to_string())),
        None => Err(QueryError::InvalidTimeFormat(value.to_string())),
    }
}

/// Resolve the native timestamp-field operator form: exactly one lower
/// and one upper bound, numeric values, exclusive bounds shifted by one
/// millisecond to the closed interval the chunker works with.
fn resolve_timestamp_clauses(clauses: &[&FilterClause]) -> QueryResult<TimeWindow> {
    if clauses.len() != 2 {
        return Err(QueryError::IncompleteTimeRange);
    }

    let first_cmp = clauses[0]
        .operator
        .as_deref()
        .and_then(Comparator::from_operator);
    // The clause carrying the lower-bound operator is the start
    let (start_clause, end_clause) = if first_cmp.is_some_and(|c| c.is_lower_bound()) {
        (clauses[0], clauses[1])
    } else {
        (clauses[1], clauses[0])
    };

    let mut start = start_clause
        .value
        .as_i64()
        .ok_or(QueryError::InvalidTimestampValue(TimeBound::Start))?;
    let mut end = end_clause
        .value
        .as_i64()
        .ok_or(QueryError::InvalidTimestampValue(TimeBound::End))?;

    if start_clause.operator.as_deref() == Some(">") {
        start += 1;
    }
    if end_clause.operator.as_deref() == Some("<") {
        end -= 1;
    }
    TimeWindow::new(start, end)
}

/// Partition the select list into aggregate and plain keys. The two
/// modes are mutually exclusive within a request.
fn split_select(select: Option<&[String]>) -> QueryResult<(Vec<String>, Vec<String>)> {
    let mut agg_keys = Vec::new();
    let mut plain_keys = Vec::new();
    for key in select.unwrap_or(&[]) {
        if key.starts_with(SUM_PREFIX) {
            if !key.ends_with(')') {
                return Err(QueryError::InvalidAggregateKey(key.clone()));
            }
            agg_keys.push(key.clone());
        } else {
            plain_keys.push(key.clone());
        }
    }
    if !agg_keys.is_empty() && !plain_keys.is_empty() {
        return Err(QueryError::MixedSelectMode);
    }
    Ok((agg_keys, plain_keys))
}

/// Dots are not valid in grouped output names, replace with underscores
fn underscored(field: &str) -> String {
    field.replace('.', "_")
}

/// Build the group stage when aggregate keys exist or grouping fields
/// were requested.
fn build_group(
    agg_keys: &[String],
    group_by: Option<&[String]>,
) -> QueryResult<Option<StageDescriptor>> {
    let group_fields = group_by.unwrap_or(&[]);
    if agg_keys.is_empty() && group_fields.is_empty() {
        return Ok(None);
    }

    let keys = group_fields
        .iter()
        .map(|field| GroupKey {
            name: underscored(field),
            source: field.clone(),
        })
        .collect();

    let mut sums = Vec::with_capacity(agg_keys.len());
    for key in agg_keys {
        let source = key
            .strip_prefix(SUM_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| QueryError::InvalidAggregateKey(key.clone()))?;
        sums.push(SumSpec {
            name: underscored(key),
            source: source.to_string(),
        });
    }
    Ok(Some(StageDescriptor::Group { keys, sums }))
}

/// Build the projection stage for plain select keys
fn build_project(plain_keys: &[String]) -> Option<StageDescriptor> {
    if plain_keys.is_empty() {
        return None;
    }
    Some(StageDescriptor::Project {
        fields: plain_keys.to_vec(),
    })
}

/// Fold the sort entries into one ordering stage and report whether the
/// timestamp field was explicitly included.
fn build_sort(
    entries: Option<&[(String, String)]>,
) -> QueryResult<(Option<StageDescriptor>, bool)> {
    let entries = match entries {
        Some(e) if !e.is_empty() => e,
        _ => return Ok((None, false)),
    };

    let mut order = Vec::with_capacity(entries.len());
    let mut time_sort_present = false;
    for (field, token) in entries {
        let dir = SortDirection::from_order(token)
            .ok_or_else(|| QueryError::InvalidSortOrder(token.clone()))?;
        if field == TIMESTAMP_FIELD {
            time_sort_present = true;
        }
        order.push((field.clone(), dir));
    }
    Ok((Some(StageDescriptor::Sort { order }), time_sort_present))
}

/// Build the row-cap stage for a positive limit
fn build_limit(limit: Option<u64>) -> Option<StageDescriptor> {
    match limit {
        Some(n) if n > 0 => Some(StageDescriptor::Limit { limit: n }),
        _ => None,
    }
}

/// Divide a resolved window into `pool_size` contiguous, non-overlapping,
/// inclusive sub-windows of equal width, the last absorbing the
/// remainder. Windows narrower than the pool stay whole.
fn chunk_windows(window: TimeWindow, pool_size: usize) -> ChunkPlan {
    let n = pool_size.max(1) as i64;
    let span = window.span_ms();
    if n == 1 || span < n {
        return ChunkPlan::single(window);
    }

    let step = span / n;
    let mut windows = Vec::with_capacity(n as usize);
    for i in 0..n {
        let start = window.start + i * step;
        let end = if i == n - 1 {
            window.end
        } else {
            start + step - 1
        };
        windows.push(TimeWindow { start, end });
    }
    ChunkPlan { windows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clause(field: &str, op: Option<&str>, value: Value) -> FilterClause {
        FilterClause::new(field, op.map(str::to_string), value)
    }

    fn request_with_where(clauses: Vec<FilterClause>) -> QueryRequest {
        QueryRequest {
            table: "ipfix_collection".to_string(),
            where_clauses: Some(clauses),
            ..Default::default()
        }
    }

    #[test]
    fn test_relative_window_resolves_with_start_before_end() {
        let outcome = compile_where(Some(&[
            clause(START_TIME_KEY, None, json!("now-1d")),
            clause(END_TIME_KEY, None, json!("now")),
        ]))
        .unwrap()
        .unwrap();
        let window = outcome.window.unwrap();
        assert!(window.start < window.end);
        assert!(outcome.criteria.is_empty());
    }

    #[test]
    fn test_missing_end_time_defaults_to_now() {
        let outcome = compile_where(Some(&[clause(START_TIME_KEY, None, json!("now-1h"))]))
            .unwrap()
            .unwrap();
        let window = outcome.window.unwrap();
        // End should land within a second of the current instant
        let now = chrono::Utc::now().timestamp_millis();
        assert!((now - window.end).abs() < 1000);
        assert!((window.end - window.start - 3600 * 1000).abs() < 1000);
    }

    #[test]
    fn test_timestamp_operator_pair_resolves() {
        let outcome = compile_where(Some(&[
            clause(TIMESTAMP_FIELD, Some(">="), json!(1522050048000_i64)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1522053648000_i64)),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            outcome.window.unwrap(),
            TimeWindow {
                start: 1522050048000,
                end: 1522053648000
            }
        );
    }

    #[test]
    fn test_timestamp_operator_pair_in_reversed_order() {
        let outcome = compile_where(Some(&[
            clause(TIMESTAMP_FIELD, Some("<="), json!(1522053648000_i64)),
            clause(TIMESTAMP_FIELD, Some(">="), json!(1522050048000_i64)),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            outcome.window.unwrap(),
            TimeWindow {
                start: 1522050048000,
                end: 1522053648000
            }
        );
    }

    #[test]
    fn test_exclusive_bounds_shift_one_millisecond() {
        let outcome = compile_where(Some(&[
            clause(TIMESTAMP_FIELD, Some(">"), json!(1000)),
            clause(TIMESTAMP_FIELD, Some("<"), json!(2000)),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(outcome.window.unwrap(), TimeWindow { start: 1001, end: 1999 });
    }

    #[test]
    fn test_non_numeric_timestamp_value_names_the_bound() {
        let err = compile_where(Some(&[
            clause(TIMESTAMP_FIELD, Some(">="), json!(1522053648000_i64)),
            clause(TIMESTAMP_FIELD, Some("<="), json!("now")),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid endTime");

        let err = compile_where(Some(&[
            clause(TIMESTAMP_FIELD, Some(">="), json!("now")),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1522053648000_i64)),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid startTime");
    }

    #[test]
    fn test_single_timestamp_clause_is_incomplete() {
        let err = compile_where(Some(&[clause(
            TIMESTAMP_FIELD,
            Some(">="),
            json!(1522050048000_i64),
        )]))
        .unwrap_err();
        assert!(matches!(err, QueryError::IncompleteTimeRange));
    }

    #[test]
    fn test_bound_keys_and_timestamp_clauses_are_exclusive() {
        let err = compile_where(Some(&[
            clause(START_TIME_KEY, None, json!("now-1h")),
            clause(TIMESTAMP_FIELD, Some(">="), json!(1522050048000_i64)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1522053648000_i64)),
        ]))
        .unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousTimeWindow));
    }

    #[test]
    fn test_inverted_window_rejected_not_swapped() {
        let err = compile_where(Some(&[
            clause(TIMESTAMP_FIELD, Some(">="), json!(2000)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1000)),
        ]))
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidTimeWindow { .. }));
    }

    #[test]
    fn test_plain_field_equality_and_range() {
        let outcome = compile_where(Some(&[
            clause("data.AgentID", None, json!("agent-7")),
            clause("data.Bytes", Some(">="), json!(100)),
            clause("data.Bytes", Some("<"), json!(5000)),
        ]))
        .unwrap()
        .unwrap();
        assert!(outcome.window.is_none());
        assert_eq!(outcome.criteria.len(), 2);
        assert_eq!(
            outcome.criteria[0],
            (
                "data.AgentID".to_string(),
                MatchCondition::Equals(json!("agent-7"))
            )
        );
        assert_eq!(
            outcome.criteria[1],
            (
                "data.Bytes".to_string(),
                MatchCondition::Range(vec![
                    (Comparator::Gte, json!(100)),
                    (Comparator::Lt, json!(5000)),
                ])
            )
        );
    }

    #[test]
    fn test_unrecognized_operator_degrades_to_equality() {
        let outcome = compile_where(Some(&[clause("data.Proto", Some("~"), json!("tcp"))]))
            .unwrap()
            .unwrap();
        assert_eq!(
            outcome.criteria[0].1,
            MatchCondition::Equals(json!("tcp"))
        );
    }

    #[test]
    fn test_no_where_clauses_yield_none() {
        assert_eq!(compile_where(None).unwrap(), None);
        assert_eq!(compile_where(Some(&[])).unwrap(), None);
    }

    #[test]
    fn test_mixed_select_mode_rejected() {
        let err = split_select(Some(&[
            "SUM(data.DataSets.octetDeltaCount)".to_string(),
            "data.AgentID".to_string(),
        ]))
        .unwrap_err();
        assert!(matches!(err, QueryError::MixedSelectMode));
    }

    #[test]
    fn test_malformed_aggregate_key_rejected() {
        let err = split_select(Some(&["SUM(data.Bytes".to_string()])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidAggregateKey(_)));
    }

    #[test]
    fn test_group_stage_names_are_underscored() {
        let stage = build_group(
            &["SUM(data.DataSets.octetDeltaCount)".to_string()],
            Some(&["data.AgentID".to_string()]),
        )
        .unwrap()
        .unwrap();
        let StageDescriptor::Group { keys, sums } = stage else {
            panic!("expected group stage");
        };
        assert_eq!(keys[0].name, "data_AgentID");
        assert_eq!(keys[0].source, "data.AgentID");
        assert_eq!(sums[0].name, "SUM(data_DataSets_octetDeltaCount)");
        assert_eq!(sums[0].source, "data.DataSets.octetDeltaCount");
    }

    #[test]
    fn test_group_stage_from_aggregates_without_groupby() {
        let stage = build_group(&["SUM(data.Bytes)".to_string()], None)
            .unwrap()
            .unwrap();
        let StageDescriptor::Group { keys, .. } = stage else {
            panic!("expected group stage");
        };
        assert!(keys.is_empty());
    }

    #[test]
    fn test_sort_compiler_reports_timestamp_key() {
        let (stage, present) = build_sort(Some(&[
            ("data.Timestamp".to_string(), "asc".to_string()),
            ("data.Bytes".to_string(), "desc".to_string()),
        ]))
        .unwrap();
        assert!(present);
        let StageDescriptor::Sort { order } = stage.unwrap() else {
            panic!("expected sort stage");
        };
        assert_eq!(order[0].1, SortDirection::Ascending);
        assert_eq!(order[1].1, SortDirection::Descending);
    }

    #[test]
    fn test_invalid_sort_order_rejected() {
        let err = build_sort(Some(&[("data.Bytes".to_string(), "down".to_string())]))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidSortOrder(token) if token == "down"));
    }

    #[test]
    fn test_chunker_covers_window_exactly() {
        let window = TimeWindow { start: 0, end: 9_999 };
        let plan = chunk_windows(window, 4);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.windows[0].start, 0);
        assert_eq!(plan.windows[3].end, 9_999);
        for pair in plan.windows.windows(2) {
            assert_eq!(pair[1].start, pair[0].end + 1, "chunks must be contiguous");
        }
        let covered: i64 = plan.windows.iter().map(TimeWindow::span_ms).sum();
        assert_eq!(covered, window.span_ms());
    }

    #[test]
    fn test_chunker_last_window_absorbs_remainder() {
        let window = TimeWindow { start: 0, end: 10 };
        let plan = chunk_windows(window, 3);
        assert_eq!(plan.len(), 3);
        // span 11, step 3: [0,2] [3,5] [6,10]
        assert_eq!(plan.windows[0], TimeWindow { start: 0, end: 2 });
        assert_eq!(plan.windows[1], TimeWindow { start: 3, end: 5 });
        assert_eq!(plan.windows[2], TimeWindow { start: 6, end: 10 });
    }

    #[test]
    fn test_chunker_narrow_window_stays_whole() {
        let window = TimeWindow { start: 0, end: 2 };
        let plan = chunk_windows(window, 10);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.windows[0], window);
    }

    #[test]
    fn test_compile_split_produces_pool_size_pipelines() {
        let request = request_with_where(vec![
            clause(TIMESTAMP_FIELD, Some(">="), json!(0)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1_000_000)),
        ]);
        let QueryPlan::Pipelines(pipelines) = compile(&request, 4, true).unwrap() else {
            panic!("expected pipelines");
        };
        assert_eq!(pipelines.len(), 4);
        for pipeline in &pipelines {
            assert!(matches!(
                pipeline.stages[0],
                StageDescriptor::Match { window: Some(_), .. }
            ));
            // Implicit per-chunk ordering follows the match stage
            assert_eq!(pipeline.stages[1], StageDescriptor::sort_by_timestamp());
        }
    }

    #[test]
    fn test_limit_forces_single_pipeline() {
        let mut request = request_with_where(vec![
            clause(TIMESTAMP_FIELD, Some(">="), json!(0)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1_000_000)),
        ]);
        request.limit = Some(10);
        let QueryPlan::Pipelines(pipelines) = compile(&request, 4, true).unwrap() else {
            panic!("expected pipelines");
        };
        assert_eq!(pipelines.len(), 1);
        assert!(matches!(
            pipelines[0].stages.last(),
            Some(StageDescriptor::Limit { limit: 10 })
        ));
    }

    #[test]
    fn test_aggregates_force_single_pipeline() {
        let mut request = request_with_where(vec![
            clause(TIMESTAMP_FIELD, Some(">="), json!(0)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1_000_000)),
        ]);
        request.select = Some(vec!["SUM(data.Bytes)".to_string()]);
        request.group_by = Some(vec!["data.AgentID".to_string()]);
        let QueryPlan::Pipelines(pipelines) = compile(&request, 4, true).unwrap() else {
            panic!("expected pipelines");
        };
        assert_eq!(pipelines.len(), 1);
    }

    #[test]
    fn test_explicit_timestamp_sort_suppresses_implicit_ordering() {
        let mut request = request_with_where(vec![
            clause(TIMESTAMP_FIELD, Some(">="), json!(0)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1_000_000)),
        ]);
        request.sort = Some(vec![(TIMESTAMP_FIELD.to_string(), "desc".to_string())]);
        let QueryPlan::Pipelines(pipelines) = compile(&request, 4, false).unwrap() else {
            panic!("expected pipelines");
        };
        let sorts: Vec<_> = pipelines[0]
            .stages
            .iter()
            .filter(|s| matches!(s, StageDescriptor::Sort { .. }))
            .collect();
        assert_eq!(sorts.len(), 1);
    }

    #[test]
    fn test_empty_request_compiles_to_full_scan() {
        let request = QueryRequest {
            table: "ipfix_collection".to_string(),
            ..Default::default()
        };
        assert_eq!(compile(&request, 4, true).unwrap(), QueryPlan::FullScan);
    }

    #[test]
    fn test_criteria_without_window_compile_to_one_match_pipeline() {
        let request = request_with_where(vec![clause(
            "data.Header.SequenceNo",
            None,
            json!(123456),
        )]);
        let QueryPlan::Pipelines(pipelines) = compile(&request, 4, true).unwrap() else {
            panic!("expected pipelines");
        };
        assert_eq!(pipelines.len(), 1);
        assert!(matches!(
            &pipelines[0].stages[0],
            StageDescriptor::Match { window: None, criteria } if criteria.len() == 1
        ));
    }

    #[test]
    fn test_non_match_stage_order_is_fixed() {
        let mut request = request_with_where(vec![
            clause(TIMESTAMP_FIELD, Some(">="), json!(0)),
            clause(TIMESTAMP_FIELD, Some("<="), json!(1_000_000)),
        ]);
        request.select = Some(vec!["SUM(data.Bytes)".to_string()]);
        request.group_by = Some(vec!["data.AgentID".to_string()]);
        request.sort = Some(vec![("SUM(data_Bytes)".to_string(), "desc".to_string())]);
        request.limit = Some(5);
        let QueryPlan::Pipelines(pipelines) = compile(&request, 4, true).unwrap() else {
            panic!("expected pipelines");
        };
        let kinds: Vec<_> = pipelines[0]
            .stages
            .iter()
            .map(|s| match s {
                StageDescriptor::Match { .. } => "match",
                StageDescriptor::Sort { .. } => "sort",
                StageDescriptor::Group { .. } => "group",
                StageDescriptor::Project { .. } => "project",
                StageDescriptor::Limit { .. } => "limit",
            })
            .collect();
        assert_eq!(kinds, vec!["match", "sort", "group", "sort", "limit"]);
    }
}
