//! Rendering of `scheduledStartTime` values.
//!
//! YouTube wants an ISO 8601 timestamp with an explicit numeric offset rather than the `Z` form:
//! `YYYY-MM-DDTHH:mm:ss±HH:00`.
//!
//! Only whole-hour offsets are represented. Zones with a minute component (India, Nepal, parts of
//! Australia, ...) are truncated toward zero, so `+05:30` is sent as `+05:00` and the broadcast is
//! scheduled half an hour off. Callers in such zones should convert to a whole-hour zone first.

use jiff::Zoned;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::error::{Error, Result};

/// Formats `at` as a `scheduledStartTime` using its own UTC offset.
pub fn format_scheduled_start(at: &Zoned) -> String {
    let offset_seconds = at.offset().seconds();
    // `/` truncates toward zero, which is what we want for both signs.
    let hours = offset_seconds / 3600;
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    format!(
        "{}{sign}{:02}:00",
        at.strftime("%Y-%m-%dT%H:%M:%S"),
        hours.abs()
    )
}

/// Interprets a wall-clock time in the system time zone and formats it.
pub fn local_scheduled_start(at: DateTime) -> Result<String> {
    let zoned = at
        .to_zoned(TimeZone::system())
        .map_err(|e| Error::InvalidArgument(format!("{at} is not a valid local time: {e}")))?;
    Ok(format_scheduled_start(&zoned))
}
