//! Wall-clock helpers for sample timestamps.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

/// The format used when a sample arrives without a timestamp of its own.
pub const SAMPLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A timestamp string that could not be understood.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unrecognized timestamp {:?}", self.0)
    }
}

/// The current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now() -> String {
    format(Utc::now())
}

/// Format `time` the way samples without a timestamp are stamped.
pub fn format(time: DateTime<Utc>) -> String {
    time.format(SAMPLE_TIME_FORMAT).to_string()
}

/// Parse a sample timestamp into nanoseconds since the Unix epoch.
///
/// RFC 3339 strings keep their offset. Anything without an offset is taken to
/// be UTC, with either a `T` or a space between date and time and optional
/// fractional seconds.
pub fn parse_ns(timestamp: &str) -> Result<i64, ParseError> {
    let utc = match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&Utc).naive_utc(),
        Err(_) => {
            let mut parsed = None;
            for fmt in NAIVE_FORMATS.iter() {
                if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, fmt) {
                    parsed = Some(naive);
                    break;
                }
            }
            match parsed {
                Some(naive) => naive,
                None => return Err(ParseError(timestamp.to_string())),
            }
        }
    };
    utc.timestamp()
        .checked_mul(1_000_000_000)
        .and_then(|ns| ns.checked_add(i64::from(utc.timestamp_subsec_nanos())))
        .ok_or_else(|| ParseError(timestamp.to_string()))
}
