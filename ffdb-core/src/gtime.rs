//! Epoch-time, julian-date and load-date helpers.
//!
//! Epoch times are seconds since 1970-01-01T00:00:00 UTC as `f64`. Julian dates are the
//! CSS `YYYYDDD` integers (`2021001` is 2021 Jan 1). Load dates serialize as
//! `%Y-%m-%d %H:%M:%S`.
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::errors::FfdbError;
use crate::Result;

pub const LDDATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert an epoch time to the CSS julian date `YYYYDDD`. Exact midnight belongs to the
/// day it begins.
pub fn epoch_to_jdate(epoch: f64) -> i64 {
    let dt = epoch_to_datetime(epoch);
    (dt.year() as i64) * 1000 + dt.ordinal() as i64
}

/// Convert a CSS julian date to the epoch time of its midnight.
pub fn jdate_to_epoch(jdate: i64) -> Result<f64> {
    let year = (jdate / 1000) as i32;
    let doy = (jdate % 1000) as u32;
    let date = NaiveDate::from_yo_opt(year, doy).ok_or(FfdbError::BadObject {
        reason: format!("invalid julian date {}", jdate),
    })?;
    let dt = date.and_hms_opt(0, 0, 0).unwrap();
    Ok(dt.and_utc().timestamp() as f64)
}

/// Convert an epoch time to a calendar date-time, truncating fractional seconds.
pub fn epoch_to_datetime(epoch: f64) -> NaiveDateTime {
    let secs = epoch.floor() as i64;
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|d| d.naive_utc())
        .unwrap_or_else(|| NaiveDateTime::default())
}

/// The epoch time of a calendar date-time.
pub fn datetime_to_epoch(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp() as f64
}

/// The current wallclock, for `lddate` stamping.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().with_nanosecond(0).unwrap()
}

/// Format a load date; a `None` is the null literal `-`.
pub fn format_lddate(dt: Option<NaiveDateTime>) -> String {
    match dt {
        Some(d) => d.format(LDDATE_FMT).to_string(),
        None => "-".to_string(),
    }
}

/// Parse a load date field. `-` (the null literal) parses to `None`.
pub fn parse_lddate(s: &str) -> Result<Option<NaiveDateTime>> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(s, LDDATE_FMT)
        .map(Some)
        .map_err(|e| FfdbError::BadObject {
            reason: format!("invalid lddate '{}': {}", s, e),
        })
}

/// Floor an epoch time to a partition boundary of the given duration in seconds, anchored
/// at the epoch. Exact boundaries belong to the later interval.
pub fn partition_floor(epoch: f64, duration: f64) -> f64 {
    (epoch / duration).floor() * duration
}
