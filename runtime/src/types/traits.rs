use chrono::{DateTime, Utc};

/// Unix timestamp in milliseconds.
pub type Timestamp = i64;

pub trait TimestampTrait {
    fn from_secs(v: i64) -> Self;
    fn now() -> Self;
    fn to_rfc3339(&self) -> String;
}

impl TimestampTrait for Timestamp {
    fn from_secs(v: i64) -> Self {
        v * 1000
    }

    fn now() -> Self {
        Utc::now().timestamp_millis()
    }

    fn to_rfc3339(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(*self) {
            Some(dt) => dt.to_rfc3339(),
            None => self.to_string(),
        }
    }
}
