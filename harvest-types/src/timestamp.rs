//! Wall-clock timestamps for domain entities.
//!
//! Remote payloads carry dates as RFC 3339 strings, SQL-style datetimes, bare
//! dates, epoch seconds or epoch milliseconds. All of them are reduced to
//! milliseconds since the Unix epoch (UTC).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Epoch values below this are taken to be seconds rather than milliseconds.
///
/// 10^11 seconds is year 5138; 10^11 milliseconds is March 1973.
const SECONDS_THRESHOLD: f64 = 1e11;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Milliseconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Parses a textual date.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.fff]]` (read as UTC),
    /// `YYYY-MM-DD`, and numeric epoch strings.
    pub fn parse_str(input: &str) -> crate::Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(crate::Error::InvalidTimestamp("empty string".into()));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.timestamp_millis()));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self(Utc.from_utc_datetime(&naive).timestamp_millis()));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(Utc.from_utc_datetime(&naive).timestamp_millis()));
            }
        }
        if let Ok(number) = s.parse::<f64>() {
            return Self::from_epoch(number);
        }

        Err(crate::Error::InvalidTimestamp(format!("unrecognized date: {s:?}")))
    }

    /// Interprets a numeric epoch value.
    ///
    /// Values with magnitude below 10^11 are seconds, larger values milliseconds.
    pub fn from_epoch(value: f64) -> crate::Result<Self> {
        if !value.is_finite() {
            return Err(crate::Error::InvalidTimestamp(format!("non-finite epoch {value}")));
        }
        let millis = if value.abs() < SECONDS_THRESHOLD {
            value * 1000.0
        } else {
            value
        };
        Self::checked(millis)
    }

    /// Builds a timestamp from an epoch-seconds plus nanoseconds pair.
    pub fn from_seconds_nanos(seconds: f64, nanos: f64) -> crate::Result<Self> {
        if !seconds.is_finite() || !nanos.is_finite() {
            return Err(crate::Error::InvalidTimestamp("non-finite seconds/nanos".into()));
        }
        Self::checked(seconds * 1000.0 + nanos / 1_000_000.0)
    }

    fn checked(millis: f64) -> crate::Result<Self> {
        let millis = millis.trunc();
        if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
            return Err(crate::Error::InvalidTimestamp(format!("epoch {millis} out of range")));
        }
        let millis = millis as i64;
        // Anything chrono cannot represent is not a date we want to display.
        if DateTime::<Utc>::from_timestamp_millis(millis).is_none() {
            return Err(crate::Error::InvalidTimestamp(format!("epoch {millis} out of range")));
        }
        Ok(Self(millis))
    }

    /// Formats the timestamp as RFC 3339 with millisecond precision.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| self.0.to_string())
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}
