use crate::ast::Expr;

pub use parse_error::*;
pub use utils::*;

mod parse_error;
mod utils;

/// Turns query text into an expression tree.
///
/// The grammar lives outside this crate. Anything able to produce an [`Expr`] from text
/// can be plugged in, including plain closures.
pub trait QueryParser: Send + Sync {
    fn parse(&self, q: &str) -> ParseResult<Expr>;
}

impl<F> QueryParser for F
where
    F: Fn(&str) -> ParseResult<Expr> + Send + Sync,
{
    fn parse(&self, q: &str) -> ParseResult<Expr> {
        self(q)
    }
}
