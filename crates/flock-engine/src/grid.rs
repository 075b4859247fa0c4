//! Build the ordered slot grid a flock is queried over.
//!
//! A date range plus a daily window of whole hours, cut into fixed-width slots
//! of local time and converted to UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::interval::Interval;

/// Slot width used when none is given.
pub const DEFAULT_SLOT_MINUTES: u32 = 15;

/// Latest hour a daily window may end at (midnight of the next day).
pub const MAX_HOUR: u32 = 24;

/// Shape of a slot grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// First day of the grid (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the grid (inclusive).
    pub end_date: NaiveDate,
    /// Local hour each day's window opens at.
    pub start_hour: u32,
    /// Local hour each day's window closes at, at most [`MAX_HOUR`].
    pub end_hour: u32,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    /// IANA timezone the window is expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_slot_minutes() -> u32 {
    DEFAULT_SLOT_MINUTES
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Cut every day of `spec` into consecutive slots, in chronological order.
///
/// A trailing slot shorter than `slot_minutes` is truncated at `end_hour`.
/// Slots whose local start or end does not exist (a DST gap) are skipped.
///
/// # Errors
/// Returns `EngineError::InvalidGrid` when the date range is inverted, the
/// hour window is empty or out of range, or the slot width is zero, and
/// `EngineError::InvalidTimezone` for an unknown timezone.
pub fn build_interval_grid(spec: &GridSpec) -> Result<Vec<Interval>> {
    if spec.start_date > spec.end_date {
        return Err(EngineError::InvalidGrid(format!(
            "start date {} is after end date {}",
            spec.start_date, spec.end_date
        )));
    }
    if spec.start_hour >= spec.end_hour || spec.end_hour > MAX_HOUR {
        return Err(EngineError::InvalidGrid(format!(
            "hour window {}..{} must satisfy start < end <= {}",
            spec.start_hour, spec.end_hour, MAX_HOUR
        )));
    }
    if spec.slot_minutes == 0 {
        return Err(EngineError::InvalidGrid(
            "slot width must be at least one minute".to_string(),
        ));
    }

    let tz: Tz = spec
        .timezone
        .parse()
        .map_err(|_| EngineError::InvalidTimezone(spec.timezone.clone()))?;

    let slot = Duration::minutes(i64::from(spec.slot_minutes));
    let mut intervals = Vec::new();

    for date in spec
        .start_date
        .iter_days()
        .take_while(|date| *date <= spec.end_date)
    {
        let midnight = date.and_time(NaiveTime::MIN);
        let window_end = midnight + Duration::hours(i64::from(spec.end_hour));
        let mut local = midnight + Duration::hours(i64::from(spec.start_hour));

        while local < window_end {
            let next = (local + slot).min(window_end);
            match (to_utc(tz, local), to_utc(tz, next)) {
                (Some(start), Some(end)) if start < end => intervals.push(Interval { start, end }),
                _ => trace!(%local, timezone = %tz, "skipping slot with no local time"),
            }
            local = next;
        }
    }

    debug!(
        intervals = intervals.len(),
        timezone = %tz,
        "built interval grid"
    );

    Ok(intervals)
}

fn to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
