// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Calendar and instant helpers.
//!
//! Two clocks are in play:
//!
//! - Instants (`requested_at`, `expires_at`, ...) are absolute UTC
//!   timestamps held as `time::OffsetDateTime` and stored as RFC 3339.
//! - Slot dates and wall-clock times are naive values interpreted in the
//!   single operational timezone configured for the deployment.
//!
//! The helpers here are the only place the two are converted.

use crate::error::DomainError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// Storage format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for wall-clock times.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns `DomainError::DateParseError` if the string is not a valid date.
pub fn parse_date(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| DomainError::DateParseError {
        date_string: value.to_string(),
        error: e.to_string(),
    })
}

/// Formats a date for storage.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a wall-clock time given as `HH:MM:SS` or `HH:MM`.
///
/// # Errors
///
/// Returns `DomainError::TimeParseError` if neither form matches.
pub fn parse_time(value: &str) -> Result<NaiveTime, DomainError> {
    let trimmed: &str = value.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|e| DomainError::TimeParseError {
            time_string: value.to_string(),
            error: e.to_string(),
        })
}

/// Formats a wall-clock time for storage.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parses an IANA timezone name.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimezone` for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz, DomainError> {
    name.parse::<Tz>()
        .map_err(|_| DomainError::InvalidTimezone(name.to_string()))
}

/// Normalizes an instant to UTC at whole-second precision.
#[must_use]
pub fn truncate_to_second(instant: OffsetDateTime) -> OffsetDateTime {
    let utc: OffsetDateTime = instant.to_offset(UtcOffset::UTC);
    utc - time::Duration::nanoseconds(i64::from(utc.nanosecond()))
}

/// Formats an instant as RFC 3339 in UTC at whole-second precision.
///
/// Stored instants compare correctly as text because of this normalization.
///
/// # Errors
///
/// Returns an error if the instant cannot be represented.
pub fn format_instant(instant: OffsetDateTime) -> Result<String, DomainError> {
    truncate_to_second(instant)
        .format(&Rfc3339)
        .map_err(|e| DomainError::InstantFormatError(e.to_string()))
}

/// Parses an RFC 3339 instant.
///
/// # Errors
///
/// Returns an error if the string is not RFC 3339.
pub fn parse_instant(value: &str) -> Result<OffsetDateTime, DomainError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| DomainError::InstantFormatError(format!("'{value}': {e}")))
}

/// Returns the calendar date of `instant` in the operational timezone.
///
/// # Errors
///
/// Returns an error if the instant is outside chrono's representable range.
pub fn local_date(instant: OffsetDateTime, tz: Tz) -> Result<NaiveDate, DomainError> {
    let utc = chrono::DateTime::from_timestamp(instant.unix_timestamp(), 0).ok_or_else(|| {
        DomainError::DateArithmeticOverflow {
            operation: String::from("converting instant to calendar date"),
        }
    })?;
    Ok(utc.with_timezone(&tz).date_naive())
}

/// Resolves a wall-clock time on a date in the operational timezone to an instant.
///
/// A wall-clock time inside a DST gap resolves to the first valid instant
/// after the gap; an ambiguous time resolves to its earlier occurrence.
///
/// # Errors
///
/// Returns an error if no instant can be resolved.
pub fn local_instant(
    date: NaiveDate,
    time: NaiveTime,
    tz: Tz,
) -> Result<OffsetDateTime, DomainError> {
    let naive: NaiveDateTime = date.and_time(time);
    let resolved = tz
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: format!("resolving {naive} in {tz}"),
        })?;

    OffsetDateTime::from_unix_timestamp(resolved.timestamp()).map_err(|e| {
        DomainError::DateArithmeticOverflow {
            operation: format!("converting {naive} to an instant: {e}"),
        }
    })
}

/// Adds whole days to a date.
///
/// # Errors
///
/// Returns `DomainError::DateArithmeticOverflow` past the calendar's range.
pub fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, DomainError> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: format!("adding {days} days to {date}"),
        })
}
