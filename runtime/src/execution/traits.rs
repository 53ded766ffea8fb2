use promql_parser::ast::Expr;

use crate::execution::EvalConfig;
use crate::runtime_error::RuntimeResult;
use crate::types::Timeseries;

/// Evaluates a parsed expression over the window described by an [`EvalConfig`].
///
/// Implementations must return, for every series, values and timestamps of equal length.
/// Several series may share one timestamp vector. Deadline handling is up to the
/// implementation; the caller surfaces whatever error it returns unchanged.
pub trait Evaluator: Send + Sync {
    fn eval(&self, ec: &EvalConfig, expr: &Expr) -> RuntimeResult<Vec<Timeseries>>;
}

impl<F> Evaluator for F
where
    F: Fn(&EvalConfig, &Expr) -> RuntimeResult<Vec<Timeseries>> + Send + Sync,
{
    fn eval(&self, ec: &EvalConfig, expr: &Expr) -> RuntimeResult<Vec<Timeseries>> {
        self(ec, expr)
    }
}
