use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Range;

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Default, Debug, PartialEq, Eq, Clone, Error)]
pub enum ParseError {
    #[error("{0}")]
    ArgumentError(String),
    #[error(transparent)]
    Unexpected(ParseErr),
    #[error("Duplicate argument `{0}`")]
    DuplicateArgument(String),
    #[error("Unexpected end of text")]
    UnexpectedEOF,
    #[error("Invalid aggregation function `{0}`")]
    InvalidAggregateFunction(String),
    #[error("Expected positive duration: found `{0}`")]
    InvalidDuration(String),
    #[error("Expected number: found `{0}`")]
    InvalidNumber(String),
    #[error("Error expanding WITH expression: `{0}`")]
    WithExprExpansionError(String),
    #[error("Syntax Error: `{0}`")]
    SyntaxError(String),
    #[error("{0}")]
    General(String),
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),
    #[error("{0}")]
    InvalidSelector(String),
    #[error("Unknown function {0}")]
    InvalidFunction(String),
    #[error("{0}")]
    Unsupported(String),
    #[default]
    #[error("Parse error")]
    Other,
}

/// ParseErr wraps a parsing error with line and position context.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub struct ParseErr {
    pub range: Range<usize>,
    pub err: String,
    /// line_offset is an additional line offset to be added. Only used inside unit tests.
    pub line_offset: usize,
}

impl ParseErr {
    pub fn new(msg: &str, range: Range<usize>) -> Self {
        Self {
            range,
            err: msg.to_string(),
            line_offset: 0,
        }
    }
}

impl Display for ParseErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let line = self.line_offset + 1;
        let col = self.range.start;
        write!(f, "{}:{}: parse error: {}", line, col, self.err)
    }
}
