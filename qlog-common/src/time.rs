//! Timestamp utilities
//!
//! ADIF carries dates as `YYYYMMDD` and times as `HHMM` or `HHMMSS`, always
//! in UTC. Services also hand out ISO-like stamps (`2024-01-05 12:34:56`)
//! in vendor fields, so [`parse_timestamp`] accepts both shapes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::{Error, Result};

/// Parse an ADIF date (`YYYYMMDD`)
pub fn parse_adif_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!("malformed ADIF date '{}'", value)));
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|e| Error::InvalidInput(format!("invalid ADIF date '{}': {}", value, e)))
}

/// Parse an ADIF time (`HHMM` or `HHMMSS`)
pub fn parse_adif_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!("malformed ADIF time '{}'", value)));
    }
    let parsed = match value.len() {
        4 => NaiveTime::parse_from_str(value, "%H%M"),
        6 => NaiveTime::parse_from_str(value, "%H%M%S"),
        _ => return Err(Error::InvalidInput(format!("malformed ADIF time '{}'", value))),
    };
    parsed.map_err(|e| Error::InvalidInput(format!("invalid ADIF time '{}': {}", value, e)))
}

/// Combine an ADIF date and time into a UTC timestamp
pub fn adif_datetime(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let date = parse_adif_date(date)?;
    let time = parse_adif_time(time)?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Parse a date or timestamp in any of the shapes services and users hand out
///
/// Accepted: RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM`,
/// `YYYY-MM-DD`, `YYYYMMDD`, `YYYYMMDD HHMM[SS]`. Values without an offset
/// are taken as UTC; date-only values resolve to midnight.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }
    if let Some((date, time)) = value.split_once(' ') {
        return adif_datetime(date, time);
    }
    parse_adif_date(value).map(start_of_day)
}

/// Format a date the way ADIF-speaking services expect in query strings
pub fn format_iso_date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}
