//! Store timestamps.
//!
//! Timestamps are truncated to microseconds and persisted as fixed-width
//! UTC RFC 3339 text, so comparing the stored strings compares the instants.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;

use crate::error::{BackendError, StorageError, StorageResult};

/// Formats a timestamp the way it is persisted and exposed in `meta.lastUpdated`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a persisted timestamp.
pub fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::Backend(BackendError::SerializationError {
                message: format!("invalid stored timestamp '{s}': {e}"),
            })
        })
}

/// A clock whose readings strictly increase.
///
/// Wall-clock steps backwards (or two writes inside one microsecond) are
/// absorbed by advancing one microsecond past the previous reading.
#[derive(Debug)]
pub struct MonotonicClock {
    last: Mutex<DateTime<Utc>>,
}

impl MonotonicClock {
    /// Creates a clock with no prior readings.
    pub fn new() -> Self {
        Self {
            last: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Returns the next timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        self.now_after(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns the next timestamp, strictly later than `floor`.
    ///
    /// Used for updates, whose stamp must not precede the stored
    /// `last_updated` even if that was written by another process.
    pub fn now_after(&self, floor: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let wall = Utc::now().trunc_subsecs(6);
        let bound = (*last).max(floor);
        let next = if wall > bound {
            wall
        } else {
            bound + Duration::microseconds(1)
        };
        *last = next;
        next
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
