use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use pretty_assertions::assert_eq;
use test_case::test_case;

use promql_parser::ast::{AggregateModifier, AggregationExpr, DurationExpr, Expr, MetricExpr, RollupExpr};
use promql_parser::label::LabelFilter;
use promql_parser::parser::{ParseError, ParseResult};

use crate::execution::{exec, expand_with_exprs, Context, EvalConfig, Evaluator, SessionConfig};
use crate::provider::Deadline;
use crate::runtime_error::{RuntimeError, RuntimeResult};
use crate::types::{MetricName, Tag, Timeseries};

/// Understands bare metric names and single-argument calls such as `sort_desc(foo)`.
fn stub_parse(q: &str) -> ParseResult<Expr> {
    let q = q.trim();
    if let Some(body) = q.strip_suffix(')') {
        let (name, arg) = body
            .split_once('(')
            .ok_or_else(|| ParseError::SyntaxError(format!("unbalanced parens in {q:?}")))?;
        return Ok(Expr::call(name, vec![stub_parse(arg)?]));
    }
    let is_ident = !q.is_empty()
        && q.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if is_ident {
        Ok(Expr::metric(q))
    } else {
        Err(ParseError::SyntaxError(format!("unexpected token in {q:?}")))
    }
}

fn context_with<E: Evaluator + 'static>(evaluator: E) -> Context {
    Context::new(Arc::new(stub_parse), Arc::new(evaluator))
}

fn series(ec: &EvalConfig, labels: &[&str], value: impl Fn(usize) -> f64) -> RuntimeResult<Timeseries> {
    let timestamps = ec.timestamps()?;
    let values = (0..timestamps.len()).map(value).collect();
    let mn = MetricName::from_strings(labels)?;
    Ok(Timeseries::new(timestamps, values).with_metric_name(mn))
}

/// One series per job value, in the given order.
fn jobs_evaluator(jobs: Vec<String>) -> impl Evaluator {
    move |ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        jobs.iter()
            .map(|job| series(ec, &["__name__", "foo", "job", job.as_str()], |i| i as f64))
            .collect()
    }
}

fn job_values(rv: &[crate::provider::QueryResult]) -> Vec<String> {
    rv.iter()
        .map(|r| r.metric.tag_value("job").cloned().unwrap_or_default())
        .collect()
}

#[test]
fn test_window_is_extended_for_evaluation_only() {
    let seen_end = Arc::new(AtomicI64::new(0));
    let seen = Arc::clone(&seen_end);
    let context = context_with(move |ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        seen.store(ec.end, Ordering::SeqCst);
        Ok(vec![series(ec, &["__name__", "foo", "job", "a"], |i| i as f64)?])
    });

    let mut ec = EvalConfig::new(1000, 2000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();

    assert_eq!(seen_end.load(Ordering::SeqCst), 2100);
    assert_eq!(ec.end, 2000);
    assert_eq!(rv.len(), 1);
    let expected: Vec<i64> = (1000..=2000).step_by(100).collect();
    assert_eq!(rv[0].timestamps, expected);
    assert_eq!(rv[0].values.len(), 11);
    assert_eq!(rv[0].values[10], 10.0);
}

#[test]
fn test_shared_timestamps_are_trimmed_once_per_series() {
    let retained: Arc<Mutex<Option<Arc<Vec<i64>>>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&retained);
    let context = context_with(move |ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        let backing = Arc::new(ec.timestamps()?);
        *slot.lock().unwrap() = Some(Arc::clone(&backing));
        let rv = ["a", "b", "c"]
            .iter()
            .map(|job| -> RuntimeResult<Timeseries> {
                let mn = MetricName::from_strings(&["__name__", "foo", "job", job])?;
                let values = vec![1.0; backing.len()];
                Ok(Timeseries::with_shared_timestamps(&backing, &values).with_metric_name(mn))
            })
            .collect::<RuntimeResult<Vec<_>>>()?;
        Ok(rv)
    });

    let mut ec = EvalConfig::new(0, 500, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();

    assert_eq!(rv.len(), 3);
    for r in &rv {
        assert_eq!(r.timestamps, vec![0, 100, 200, 300, 400, 500]);
        assert_eq!(r.values.len(), r.timestamps.len());
    }
    let backing = retained.lock().unwrap().clone().unwrap();
    assert_eq!(backing.len(), 7);
}

#[test]
fn test_nan_only_series_are_dropped() {
    let context = context_with(|ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        let n = ec.data_points();
        Ok(vec![
            series(ec, &["__name__", "foo", "job", "all_nan"], |_| f64::NAN)?,
            // only the extra trailing sample is a number
            series(ec, &["__name__", "foo", "job", "trailing"], |i| {
                if i == n - 1 {
                    1.0
                } else {
                    f64::NAN
                }
            })?,
            series(ec, &["__name__", "foo", "job", "partial"], |i| {
                if i % 2 == 0 {
                    f64::NAN
                } else {
                    i as f64
                }
            })?,
        ])
    });

    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();

    assert_eq!(job_values(&rv), vec!["partial"]);
    let values = &rv[0].values;
    assert_eq!(values.len(), 11);
    assert_eq!(values.iter().filter(|v| v.is_nan()).count(), 6);
    assert_eq!(values[1], 1.0);
}

#[test]
fn test_empty_result() {
    let context = context_with(|_: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> { Ok(vec![]) });
    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();
    assert!(rv.is_empty());
}

#[test]
fn test_duplicate_series_is_an_error() {
    let context = context_with(|ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        let timestamps = ec.timestamps()?;
        let values = vec![1.0; timestamps.len()];
        let mut first = MetricName::new("foo");
        first.tags.push(Tag::new("b", "2"));
        first.tags.push(Tag::new("a", "1"));
        let mut second = MetricName::new("foo");
        second.tags.push(Tag::new("a", "1"));
        second.tags.push(Tag::new("b", "2"));
        Ok(vec![
            series(ec, &["__name__", "bar", "job", "valid"], |_| 1.0)?,
            Timeseries::new(timestamps.clone(), values.clone()).with_metric_name(first),
            Timeseries::new(timestamps, values).with_metric_name(second),
        ])
    });

    let mut ec = EvalConfig::new(0, 1000, 100);
    let err = exec(&context, &mut ec, "foo").unwrap_err();

    assert_eq!(
        err,
        RuntimeError::DuplicateOutputSeries {
            metric_group: "foo".to_string(),
            labels: r#"{a="1", b="2"}"#.to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        r#"duplicate output timeseries: foo{a="1", b="2"}"#
    );
    assert_eq!(ec.end, 1000);
}

#[test]
fn test_duplicate_of_nan_only_series_is_ignored() {
    let context = context_with(|ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        Ok(vec![
            series(ec, &["__name__", "foo", "job", "a"], |_| 1.0)?,
            series(ec, &["__name__", "foo", "job", "a"], |_| f64::NAN)?,
        ])
    });
    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();
    assert_eq!(rv.len(), 1);
}

#[test]
fn test_marshaled_identity_matches_metric() {
    let context = context_with(jobs_evaluator(vec!["a".to_string()]));
    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();

    let decoded = MetricName::unmarshal(&rv[0].metric_name_marshaled).unwrap();
    assert_eq!(decoded, rv[0].metric);
    assert_eq!(decoded.to_string(), r#"foo{job="a"}"#);
}

#[test_case("foo", true ; "plain selector")]
#[test_case("rate(foo)", true ; "other function")]
#[test_case("sort(foo)", false ; "sort")]
#[test_case("sort_desc(foo)", false ; "sort desc")]
#[test_case("SORT_DESC(foo)", false ; "sort desc upper case")]
#[test_case("abs(sort_desc(foo))", true ; "nested sort is not top level")]
fn test_sort_policy(query: &str, sorted: bool) {
    let jobs: Vec<String> = ["e", "c", "a", "d", "b"].iter().map(|s| s.to_string()).collect();
    let context = context_with(jobs_evaluator(jobs.clone()));

    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, query).unwrap();

    let expected = if sorted {
        vec!["a", "b", "c", "d", "e"]
    } else {
        vec!["e", "c", "a", "d", "b"]
    };
    assert_eq!(job_values(&rv), expected);
}

#[test_case(99, true ; "below limit")]
#[test_case(100, true ; "at limit")]
#[test_case(101, false ; "above limit")]
#[test_case(150, false ; "well above limit")]
fn test_sort_series_limit(count: usize, sorted: bool) {
    let jobs: Vec<String> = (0..count).rev().map(|i| format!("{i:03}")).collect();
    let context = context_with(jobs_evaluator(jobs.clone()));

    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();

    let mut expected = jobs;
    if sorted {
        expected.sort();
    }
    assert_eq!(job_values(&rv), expected);
}

#[test]
fn test_sort_limit_is_configurable() {
    let jobs: Vec<String> = ["c", "b", "a"].iter().map(|s| s.to_string()).collect();
    let context = context_with(jobs_evaluator(jobs.clone()))
        .with_config(SessionConfig::new().with_max_series_to_sort(2));

    let mut ec = EvalConfig::new(0, 1000, 100);
    let rv = exec(&context, &mut ec, "foo").unwrap();

    assert_eq!(job_values(&rv), jobs);
}

#[test]
fn test_parse_error_skips_evaluation() {
    let evals = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evals);
    let context = context_with(move |_: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    });

    let mut ec = EvalConfig::new(0, 1000, 100);
    let first = exec(&context, &mut ec, "foo)").unwrap_err();
    let second = exec(&context, &mut ec, "foo)").unwrap_err();

    assert!(matches!(first, RuntimeError::ParseError(ParseError::SyntaxError(_))));
    assert_eq!(first, second);
    assert_eq!(evals.load(Ordering::SeqCst), 0);
    assert_eq!(context.parse_cache.requests(), 2);
    assert_eq!(context.parse_cache.misses(), 1);
}

#[test]
fn test_repeated_query_hits_cache() {
    let parses = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&parses);
    let parser = move |q: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        stub_parse(q)
    };
    let context = Context::new(
        Arc::new(parser),
        Arc::new(jobs_evaluator(vec!["a".to_string()])),
    );

    let mut ec = EvalConfig::new(0, 1000, 100);
    let first = exec(&context, &mut ec, "foo").unwrap();
    let second = exec(&context, &mut ec, "foo").unwrap();

    assert_eq!(first, second);
    assert_eq!(parses.load(Ordering::SeqCst), 1);
    assert_eq!(context.parse_cache.len(), 1);
}

#[test_case(2000, 1000, 100, "BUG: start cannot exceed end; got 2000 vs 1000" ; "start after end")]
#[test_case(0, 1000, 0, "BUG: step must be greater than 0; got 0" ; "zero step")]
#[test_case(0, 1000, -5, "BUG: step must be greater than 0; got -5" ; "negative step")]
fn test_invalid_window(start: i64, end: i64, step: i64, message: &str) {
    let context = context_with(jobs_evaluator(vec!["a".to_string()]));
    let mut ec = EvalConfig::new(start, end, step);

    let err = exec(&context, &mut ec, "foo").unwrap_err();

    assert_eq!(err, RuntimeError::ValidationError(message.to_string()));
    assert_eq!(context.parse_cache.requests(), 0);
    assert_eq!(ec.end, end);
}

#[test]
fn test_too_long_query() {
    let context = context_with(jobs_evaluator(vec!["a".to_string()]))
        .with_config(SessionConfig::new().with_max_query_len(8));
    let mut ec = EvalConfig::new(0, 1000, 100);

    let err = exec(&context, &mut ec, "some_long_metric").unwrap_err();
    assert_eq!(
        err.to_string(),
        "too long query; got 16 bytes; mustn't exceed 8 bytes"
    );
    assert!(exec(&context, &mut ec, "foo").is_ok());
}

#[test]
fn test_query_length_limit_can_be_disabled() {
    let context = context_with(jobs_evaluator(vec!["a".to_string()]))
        .with_config(SessionConfig::new().with_max_query_len(0));
    let mut ec = EvalConfig::new(0, 1000, 100);
    let query = format!("m{}", "x".repeat(20_000));
    assert!(exec(&context, &mut ec, &query).is_ok());
}

#[test]
fn test_evaluator_error_is_returned_unchanged() {
    let context = context_with(|_: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        Err(RuntimeError::ExecutionError("cannot fetch series".to_string()))
    });
    let mut ec = EvalConfig::new(0, 1000, 100);

    let err = exec(&context, &mut ec, "foo").unwrap_err();

    assert_eq!(
        err,
        RuntimeError::ExecutionError("cannot fetch series".to_string())
    );
    assert_eq!(ec.end, 1000);
}

#[test]
fn test_deadline_exceeded_during_evaluation() {
    let context = context_with(|ec: &EvalConfig, _: &Expr| -> RuntimeResult<Vec<Timeseries>> {
        if ec.deadline.exceeded() {
            return Err(ec.deadline.exceeded_error("rollup"));
        }
        Ok(vec![])
    });
    let expired = Deadline {
        deadline: 0,
        timeout: Duration::seconds(1),
    };
    let mut ec = EvalConfig::new(0, 1000, 100).with_deadline(expired);

    let err = exec(&context, &mut ec, "foo").unwrap_err();

    assert!(matches!(err, RuntimeError::DeadlineExceededError(_)), "{err:?}");
    assert_eq!(ec.end, 1000);
}

fn canonical_parse(q: &str) -> ParseResult<Expr> {
    if q.split_whitespace().collect::<String>() == r#"sum(rate(foo{job="a"}[5m]))by(job)"# {
        let selector = MetricExpr::new("foo").append(LabelFilter::equal("job", "a")?);
        let rollup = RollupExpr::new(Expr::MetricExpression(selector))
            .with_window(DurationExpr::new(300_000));
        let agg = AggregationExpr::new("sum", vec![Expr::call("rate", vec![rollup.into()])])
            .with_modifier(AggregateModifier::By(vec!["job".to_string()]));
        return Ok(Expr::Aggregation(agg));
    }
    stub_parse(q)
}

#[test]
fn test_expand_renders_canonical_text() {
    let context = Context::new(
        Arc::new(canonical_parse),
        Arc::new(jobs_evaluator(vec!["a".to_string()])),
    );

    let text = expand_with_exprs(&context, r#"sum( rate( foo{job="a"}[5m] ) )  by(job)"#).unwrap();

    assert_eq!(text, r#"sum(rate(foo{job="a"}[5m])) by (job)"#);
}

#[test]
fn test_expand_returns_parse_error() {
    let context = context_with(jobs_evaluator(vec![]));
    let err = expand_with_exprs(&context, "(foo").unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ParseError(ParseError::SyntaxError(
            r#"unexpected token in "(foo""#.to_string()
        ))
    );
}

#[test]
fn test_expand_shares_the_parse_cache() {
    let context = context_with(jobs_evaluator(vec!["a".to_string()]));
    assert_eq!(expand_with_exprs(&context, "sort(foo)").unwrap(), "sort(foo)");

    let mut ec = EvalConfig::new(0, 1000, 100);
    exec(&context, &mut ec, "sort(foo)").unwrap();

    assert_eq!(context.parse_cache.requests(), 2);
    assert_eq!(context.parse_cache.misses(), 1);
}

fn encode_registry(registry: &Registry) -> String {
    let mut output = String::new();
    encode(&mut output, registry).unwrap();
    output
}

#[test]
fn test_resizing_after_metrics_registration_keeps_gauges() {
    let mut registry = Registry::default();
    let context = context_with(jobs_evaluator(vec!["a".to_string()]))
        .with_metrics_registry(&mut registry)
        .with_config(SessionConfig::new().with_parse_cache_max_entries(500));

    let mut ec = EvalConfig::new(0, 1000, 100);
    exec(&context, &mut ec, "foo").unwrap();

    assert_eq!(context.parse_cache.max_entries(), 500);
    let output = encode_registry(&registry);
    assert!(
        output.contains(r#"vm_cache_requests_total{type="promql/parse"} 1"#),
        "{output}"
    );
    assert!(
        output.contains(r#"vm_cache_entries{type="promql/parse"} 1"#),
        "{output}"
    );
}

#[test]
fn test_metrics_registration_after_config() {
    let mut registry = Registry::default();
    let context = context_with(jobs_evaluator(vec!["a".to_string()]))
        .with_config(SessionConfig::new().with_parse_cache_max_entries(500))
        .with_metrics_registry(&mut registry);

    let mut ec = EvalConfig::new(0, 1000, 100);
    exec(&context, &mut ec, "foo").unwrap();
    exec(&context, &mut ec, "foo").unwrap();

    let output = encode_registry(&registry);
    assert!(
        output.contains(r#"vm_cache_requests_total{type="promql/parse"} 2"#),
        "{output}"
    );
    assert!(
        output.contains(r#"vm_cache_misses_total{type="promql/parse"} 1"#),
        "{output}"
    );
}

#[test]
fn test_shared_cache_keeps_one_registration() {
    let mut registry = Registry::default();
    let first = context_with(jobs_evaluator(vec!["a".to_string()]))
        .with_metrics_registry(&mut registry);
    let second = context_with(jobs_evaluator(vec!["b".to_string()]))
        .with_parse_cache(Arc::clone(&first.parse_cache))
        .with_metrics_registry(&mut registry);

    let mut ec = EvalConfig::new(0, 1000, 100);
    exec(&first, &mut ec, "foo").unwrap();
    exec(&second, &mut ec, "foo").unwrap();

    let output = encode_registry(&registry);
    assert_eq!(output.matches("# TYPE vm_cache_requests_total").count(), 1, "{output}");
    assert!(
        output.contains(r#"vm_cache_requests_total{type="promql/parse"} 2"#),
        "{output}"
    );
}

#[test]
fn test_tracing_does_not_change_results() {
    let jobs: Vec<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
    let plain = context_with(jobs_evaluator(jobs.clone()));
    let traced = context_with(jobs_evaluator(jobs))
        .with_config(SessionConfig::new().with_trace_enabled(true));
    assert!(traced.config.trace_enabled);

    let mut ec = EvalConfig::new(0, 1000, 100);
    let expected = exec(&plain, &mut ec, "foo").unwrap();
    let actual = exec(&traced, &mut ec, "foo").unwrap();

    assert_eq!(actual, expected);
}
