use crate::types::MetricName;

/// A single output series. Every field is owned by the result; nothing aliases the
/// evaluator's buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// The name of the metric.
    pub metric: MetricName,
    /// Canonical marshaled identity of `metric` (tags sorted by key). Unique within a
    /// response and used as its sort key.
    pub metric_name_marshaled: Vec<u8>,
    /// Values are sorted by Timestamps.
    pub values: Vec<f64>,
    pub timestamps: Vec<i64>,
}
