use std::fmt;
use std::fmt::Display;

use chrono::Duration;

use crate::types::{Timestamp, TimestampTrait};
use crate::{RuntimeError, RuntimeResult};

/// These values prevent from overflow when storing ms-precision time in i64.
const MIN_TIME_MSECS: i64 = 0;
pub const MAX_DURATION_MSECS: i64 = 100 * 365 * 24 * 3600 * 1000;

const DEFAULT_TIMEOUT_SECS: i64 = 30;

/// Deadline contains deadline with the corresponding timeout for pretty error messages.
///
/// The execution core only carries it; the evaluator is expected to check [`Deadline::exceeded`]
/// and fail with [`RuntimeError::DeadlineExceededError`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Deadline {
    /// deadline in unix timestamp milliseconds.
    pub deadline: Timestamp,
    pub timeout: Duration,
}

impl Deadline {
    /// Returns a deadline for the given timeout.
    pub fn new(timeout: Duration) -> RuntimeResult<Self> {
        Deadline::with_start_time(Timestamp::now(), timeout)
    }

    /// Returns a deadline for the given start time and timeout.
    pub fn with_start_time<T>(start_time: T, timeout: Duration) -> RuntimeResult<Self>
    where
        T: Into<Timestamp>,
    {
        let millis = timeout.num_milliseconds();
        if millis > MAX_DURATION_MSECS {
            return Err(RuntimeError::ArgumentError(format!(
                "Timeout value too large: {timeout}",
            )));
        }
        if millis < MIN_TIME_MSECS {
            return Err(RuntimeError::ArgumentError(format!(
                "Negative timeouts are not supported. Got {timeout}",
            )));
        }
        Ok(Deadline {
            deadline: start_time.into() + millis,
            timeout,
        })
    }

    /// returns true if deadline is exceeded.
    pub fn exceeded(&self) -> bool {
        Timestamp::now() > self.deadline
    }

    /// Builds the error an evaluator returns once the deadline has passed.
    pub fn exceeded_error(&self, what: &str) -> RuntimeError {
        RuntimeError::DeadlineExceededError(format!("{what}: timeout exceeded after {self}"))
    }
}

impl Default for Deadline {
    fn default() -> Self {
        let timeout = Duration::seconds(DEFAULT_TIMEOUT_SECS);
        Deadline {
            deadline: Timestamp::now() + timeout.num_milliseconds(),
            timeout,
        }
    }
}

impl TryFrom<Duration> for Deadline {
    type Error = RuntimeError;

    fn try_from(timeout: Duration) -> Result<Self, Self::Error> {
        Deadline::new(timeout)
    }
}

impl TryFrom<i64> for Deadline {
    type Error = RuntimeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Deadline::new(Duration::milliseconds(value))
    }
}

impl Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let start_time = self.deadline - self.timeout.num_milliseconds();
        let elapsed = (Timestamp::now() - start_time) as f64 / 1000_f64;
        write!(
            f,
            "{:.3} seconds (elapsed {:.3} seconds)",
            self.timeout.num_milliseconds() as f64 / 1000_f64,
            elapsed
        )
    }
}
