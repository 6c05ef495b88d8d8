use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Format used on the command line and in event files
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Error)]
pub enum TimeParseError {
    #[error("invalid date '{input}', expected yyyy-mm-ddThh:mm or RFC 3339")]
    Invalid { input: String },
    #[error("date '{input}' does not exist in the local time zone")]
    NonExistent { input: String },
}

/// Parses `yyyy-mm-ddThh:mm` in the local time zone, or a full RFC 3339 timestamp.
pub fn parse_date_time(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_date_time_in(input, &Local)
}

/// Same as [`parse_date_time`] with an explicit zone for the short format.
pub fn parse_date_time_in<Tz: TimeZone>(
    input: &str,
    zone: &Tz,
) -> Result<DateTime<Utc>, TimeParseError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| TimeParseError::Invalid {
            input: input.to_string(),
        })?;

    // Ambiguous local times (DST fall-back) resolve to the earlier instant
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::NonExistent {
            input: input.to_string(),
        })
}
