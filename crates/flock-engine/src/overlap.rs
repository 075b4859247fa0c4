//! Half-open overlap tests between an occurrence and a query slot.
//!
//! An occurrence that ends exactly when a slot starts, or starts exactly when
//! a slot ends, does NOT overlap it. Back-to-back recurring meetings depend on
//! that.

use chrono::{DateTime, Duration, Utc};

/// Whether an occurrence of `duration` starting at `occurrence_start` overlaps
/// the slot `interval_start..interval_end`.
///
/// True iff `occurrence_start < interval_end` and
/// `occurrence_start + duration > interval_start`.
pub fn occurs_during(
    occurrence_start: DateTime<Utc>,
    interval_start: DateTime<Utc>,
    interval_end: DateTime<Utc>,
    duration: Duration,
) -> bool {
    occurrence_start < interval_end && occurrence_start + duration > interval_start
}

/// Whether an occurrence that began at or before `interval_start` is still
/// running when the slot opens.
///
/// Used to carry an earlier occurrence forward into a later slot it spans.
pub fn starts_before_or_at_interval(
    occurrence_start: DateTime<Utc>,
    interval_start: DateTime<Utc>,
    duration: Duration,
) -> bool {
    occurrence_start <= interval_start && occurrence_start + duration > interval_start
}

