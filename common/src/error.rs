use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by the low level decoding helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Error {
    pub message: String,
}

impl Error {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Error {
            message: message.into(),
        }
    }
}
