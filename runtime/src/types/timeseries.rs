use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::MetricName;

/// A read-only view over a timestamp vector which may be shared by several series.
///
/// The evaluator commonly hands out one timestamp vector to every series of a result.
/// Truncating the view only shortens this series' logical length; the backing vector
/// and every other view over it are left untouched.
#[derive(Clone, Default)]
pub struct SharedTimestamps {
    backing: Arc<Vec<i64>>,
    len: usize,
}

impl SharedTimestamps {
    pub fn new(timestamps: Vec<i64>) -> Self {
        Self::from(Arc::new(timestamps))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shortens the view to `len` entries. Has no effect if `len` is not smaller than the
    /// current length.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Returns true if the backing vector is referenced by another view.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.backing) > 1
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.backing[..self.len]
    }
}

impl From<Arc<Vec<i64>>> for SharedTimestamps {
    fn from(backing: Arc<Vec<i64>>) -> Self {
        let len = backing.len();
        SharedTimestamps { backing, len }
    }
}

impl From<Vec<i64>> for SharedTimestamps {
    fn from(timestamps: Vec<i64>) -> Self {
        SharedTimestamps::new(timestamps)
    }
}

impl Deref for SharedTimestamps {
    type Target = [i64];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl PartialEq for SharedTimestamps {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for SharedTimestamps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Timeseries {
    pub metric_name: MetricName,
    pub values: Vec<f64>,
    pub timestamps: SharedTimestamps,
}

impl Timeseries {
    pub fn new(timestamps: Vec<i64>, values: Vec<f64>) -> Self {
        Timeseries {
            metric_name: MetricName::default(),
            values,
            timestamps: SharedTimestamps::new(timestamps),
        }
    }

    pub fn with_shared_timestamps(timestamps: &Arc<Vec<i64>>, values: &[f64]) -> Self {
        Timeseries {
            metric_name: MetricName::default(),
            values: Vec::from(values),
            timestamps: SharedTimestamps::from(Arc::clone(timestamps)),
        }
    }

    pub fn with_metric_name(mut self, metric_name: MetricName) -> Self {
        self.metric_name = metric_name;
        self
    }

    /// Returns true when no value is present. A series without values counts as all-NaN.
    pub fn is_all_nans(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
