//! Epoch and wall-clock conversions shared by the projectors.

use chrono::{DateTime, SecondsFormat, Utc};

/// Converts epoch seconds to an ISO-8601 UTC string (`+00:00` offset).
///
/// Absent, zero, and out-of-range inputs all yield `None`; a producer that
/// leaves a timestamp unset must never surface as `1970-01-01`.
pub fn epoch_to_iso<T: TryInto<i64>>(epoch: Option<T>) -> Option<String> {
    let secs: i64 = epoch.and_then(|s| s.try_into().ok())?;
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
}

/// Formats the run's wall-clock instant, keeping microsecond precision.
pub fn instant_to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}
