use crate::provider::Deadline;
use crate::runtime_error::{RuntimeError, RuntimeResult};
use crate::types::{Timestamp, TimestampTrait};

/// Time range and limits of a single query evaluation.
///
/// Owned by the caller. Execution advances `end` by one step while evaluating and
/// puts it back before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    pub start: Timestamp,
    pub end: Timestamp,
    pub step: i64,

    /// `max_series` is the maximum number of time series which can be scanned by the query.
    /// Zero means 'no limit'
    pub max_series: usize,

    /// The limit on the number of points which can be generated per each returned time series.
    pub max_points_per_series: usize,

    pub deadline: Deadline,
}

impl EvalConfig {
    pub fn new(start: Timestamp, end: Timestamp, step: i64) -> Self {
        EvalConfig {
            start,
            end,
            step,
            ..Default::default()
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> RuntimeResult<()> {
        if self.start > self.end {
            let msg = format!(
                "BUG: start cannot exceed end; got {} vs {}",
                self.start, self.end
            );
            return Err(RuntimeError::ValidationError(msg));
        }
        if self.step <= 0 {
            let msg = format!("BUG: step must be greater than 0; got {}", self.step);
            return Err(RuntimeError::ValidationError(msg));
        }
        Ok(())
    }

    /// Returns `start, start+step, ...` up to and including `end`.
    pub fn timestamps(&self) -> RuntimeResult<Vec<Timestamp>> {
        self.validate()?;
        let n = self.data_points();
        if self.max_points_per_series > 0 && n > self.max_points_per_series {
            let msg = format!(
                "too many points for the given step={}, start={} and end={}: {}; cannot exceed {}",
                self.step, self.start, self.end, n, self.max_points_per_series
            );
            return Err(RuntimeError::ValidationError(msg));
        }
        let mut timestamps: Vec<i64> = Vec::with_capacity(n);
        for ts in (self.start..=self.end).step_by(self.step as usize) {
            timestamps.push(ts);
        }
        Ok(timestamps)
    }

    pub fn data_points(&self) -> usize {
        if self.step <= 0 || self.end < self.start {
            return 0;
        }
        (1 + (self.end - self.start) / self.step) as usize
    }

    pub fn timerange_string(&self) -> String {
        format!("[{}..{}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            step: 0,
            max_series: 0,
            max_points_per_series: 0,
            deadline: Deadline::default(),
        }
    }
}
