use scopeguard::guard;

use crate::execution::EvalConfig;
use crate::types::Timeseries;

/// Runs `f` with the window end advanced by one step, so that rollup functions relying on
/// the sample after the last point have it available. The original end is put back on
/// every exit path, including errors and panics inside `f`.
pub(crate) fn with_extended_window<T, F>(ec: &mut EvalConfig, f: F) -> T
where
    F: FnOnce(&EvalConfig) -> T,
{
    let end = ec.end;
    ec.end = end.saturating_add(ec.step);
    let ec = guard(ec, move |ec| ec.end = end);
    f(&**ec)
}

/// Drops the trailing sample added by [`with_extended_window`] from every series.
///
/// The timestamp view is cut to the new values length rather than to a fixed index, since
/// several series may share one timestamp vector.
pub(crate) fn trim_trailing_points(tss: &mut [Timeseries]) {
    for ts in tss.iter_mut() {
        let n = ts.values.len().saturating_sub(1);
        ts.values.truncate(n);
        ts.timestamps.truncate(n);
    }
}
