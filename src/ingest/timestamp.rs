// src/ingest/timestamp.rs
//! Attaches a calendar date to the bare time-of-day strings that desk
//! feeds print next to each headline.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{RelayError, Result};

pub const FULL_TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a strict `H:M:S` triple (each part all digits, valid ranges).
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let malformed = || RelayError::MalformedTimestamp(raw.to_string());

    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(malformed());
    }

    let mut hms = [0u32; 3];
    for (slot, part) in hms.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        *slot = part.parse().map_err(|_| malformed())?;
    }

    let [h, m, s] = hms;
    if h > 23 || m > 59 || s > 59 {
        return Err(malformed());
    }
    NaiveTime::from_hms_opt(h, m, s).ok_or_else(malformed)
}

/// Date the raw time-of-day against `now`, rolling back one calendar day
/// when today's candidate would lie in the future (midnight rollover).
pub fn normalize(raw: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let time = parse_time_of_day(raw)?;
    let candidate = now.date().and_time(time);
    if candidate <= now {
        return Ok(candidate);
    }
    let yesterday: NaiveDate = now
        .date()
        .pred_opt()
        .ok_or_else(|| RelayError::MalformedTimestamp(raw.to_string()))?;
    Ok(yesterday.and_time(time))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(FULL_TIMESTAMP_FMT).to_string()
}

pub fn parse_full_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), FULL_TIMESTAMP_FMT).ok()
}

/// `"2025-01-01 23:59:59"` -> `"23:59:59"`.
pub fn time_of_day(full: &str) -> Option<&str> {
    let (_, tod) = full.trim().rsplit_once(' ')?;
    Some(tod)
}
