use std::error::Error;

use thiserror::Error;

use promql_parser::parser::ParseError;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, PartialEq, Clone, Error)]
pub enum RuntimeError {
    #[error("Argument error: {0}")]
    ArgumentError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    ParseError(#[from] ParseError),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Deadline exceeded: {0}")]
    DeadlineExceededError(String),
    #[error("duplicate output timeseries: {metric_group}{labels}")]
    DuplicateOutputSeries { metric_group: String, labels: String },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("{0}")]
    General(String),
}

impl From<&str> for RuntimeError {
    fn from(message: &str) -> Self {
        RuntimeError::General(String::from(message))
    }
}

impl From<String> for RuntimeError {
    fn from(message: String) -> Self {
        RuntimeError::General(message)
    }
}

impl<E: Error + 'static> From<(&str, E)> for RuntimeError {
    fn from((message, err): (&str, E)) -> Self {
        RuntimeError::General(format!("{}: {}", message, err))
    }
}
