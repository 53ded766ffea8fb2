use std::sync::Arc;

use ahash::AHashSet;
use tracing::{debug, field, trace_span, Span};

use promql_common::pool::get_pooled_buffer;
use promql_parser::ast::Expr;

use crate::execution::context::Context;
use crate::execution::parser_cache::{ParseCacheResult, ParseCacheValue};
use crate::execution::window::{trim_trailing_points, with_extended_window};
use crate::execution::EvalConfig;
use crate::provider::QueryResult;
use crate::runtime_error::{RuntimeError, RuntimeResult};
use crate::types::Timeseries;

const MAX_TRACED_QUERY_LEN: usize = 300;

pub(crate) fn parse_promql_internal(
    context: &Context,
    query: &str,
) -> RuntimeResult<Arc<ParseCacheValue>> {
    let span = trace_span!("parse", cached = field::Empty).entered();
    let (parsed, cached) = context.parse_promql(query)?;
    span.record("cached", cached == ParseCacheResult::CacheHit);
    Ok(parsed)
}

fn eval_expr(
    context: &Context,
    ec: &EvalConfig,
    q: &str,
    expr: &Expr,
) -> RuntimeResult<Vec<Timeseries>> {
    let is_tracing = context.trace_enabled();

    let span = if is_tracing {
        let query = truncate_query(q, MAX_TRACED_QUERY_LEN);
        trace_span!(
            "execution",
            query,
            start = ec.start,
            end = ec.end,
            series = field::Empty,
            points = field::Empty,
            points_per_series = field::Empty
        )
    } else {
        Span::none()
    }
    .entered();

    let rv = context.evaluator.eval(ec, expr)?;

    if is_tracing {
        let series_count = rv.len();
        let points_per_series = rv.first().map_or(0, |ts| ts.timestamps.len());
        span.record("series", series_count);
        span.record("points", series_count * points_per_series);
        span.record("points_per_series", points_per_series);
    }

    Ok(rv)
}

/// executes q for the given config.
///
/// The evaluator sees a window extended by one step; the extra trailing sample is removed
/// from every series before post-processing and `ec.end` is back to its original value
/// when this returns, whatever the outcome.
pub fn exec(context: &Context, ec: &mut EvalConfig, q: &str) -> RuntimeResult<Vec<QueryResult>> {
    context.validate_query(q)?;
    ec.validate()?;

    let parsed = parse_promql_internal(context, q)?;
    let expr = parsed.as_result().map_err(|e| e.clone())?;

    let mut rv = with_extended_window(ec, |ec| eval_expr(context, ec, q, expr))?;
    trim_trailing_points(&mut rv);

    let may_sort = may_sort_results(context, expr, rv.len());
    let result = timeseries_to_result(&mut rv, may_sort)?;

    debug!(
        sorted = may_sort,
        series = result.len(),
        range = %ec.timerange_string(),
        "query executed"
    );

    Ok(result)
}

/// Parses q (through the cache) and renders the expression back to canonical text.
pub fn expand_with_exprs(context: &Context, q: &str) -> RuntimeResult<String> {
    let parsed = parse_promql_internal(context, q)?;
    let expr = parsed.as_result().map_err(|e| e.clone())?;
    Ok(expr.to_string())
}

/// Results keep their evaluation order when there are too many of them, or when the query
/// itself asks for an explicit order.
pub(crate) fn may_sort_results(context: &Context, expr: &Expr, series_count: usize) -> bool {
    if series_count > context.config.max_series_to_sort {
        return false;
    }
    !(expr.is_function_named("sort") || expr.is_function_named("sort_desc"))
}

pub(crate) fn timeseries_to_result(
    tss: &mut Vec<Timeseries>,
    may_sort: bool,
) -> RuntimeResult<Vec<QueryResult>> {
    remove_empty_series(tss);
    if tss.is_empty() {
        return Ok(vec![]);
    }

    let mut result: Vec<QueryResult> = Vec::with_capacity(tss.len());
    let mut seen: AHashSet<Vec<u8>> = AHashSet::with_capacity(tss.len());
    let mut buf = get_pooled_buffer(512);

    for ts in tss.iter_mut() {
        buf.clear();
        ts.metric_name.marshal_sorted(&mut buf);

        if seen.contains(buf.as_slice()) {
            return Err(RuntimeError::DuplicateOutputSeries {
                metric_group: ts.metric_name.metric_group.clone(),
                labels: ts.metric_name.tags_string(),
            });
        }
        let marshaled = buf.to_vec();
        seen.insert(marshaled.clone());

        result.push(QueryResult {
            metric: std::mem::take(&mut ts.metric_name),
            metric_name_marshaled: marshaled,
            values: std::mem::take(&mut ts.values),
            timestamps: ts.timestamps.to_vec(),
        });
    }

    if may_sort {
        result.sort_by(|a, b| a.metric_name_marshaled.cmp(&b.metric_name_marshaled));
    }

    Ok(result)
}

/// Removes series without a single non-NaN value, keeping the order of the rest.
#[inline]
pub(crate) fn remove_empty_series(tss: &mut Vec<Timeseries>) {
    if tss.is_empty() {
        return;
    }
    tss.retain(|ts| !ts.is_all_nans());
}

fn truncate_query(q: &str, max_len: usize) -> &str {
    if q.len() <= max_len {
        return q;
    }
    let mut end = max_len;
    while !q.is_char_boundary(end) {
        end -= 1;
    }
    &q[..end]
}
