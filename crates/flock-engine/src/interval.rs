//! Query slots and per-slot availability records.
//!
//! All three types are plain call-scoped values: the caller builds them, the
//! engine borrows them, and results come back as freshly owned vectors in the
//! same order as the input slots.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A single slot whose availability is being queried.
///
/// Invariant: `start < end`. The reducer and merger reject slots that break it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.start >= self.end {
            return Err(EngineError::InvalidInterval {
                index,
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Check every slot in `intervals`, reporting the first offending index.
pub fn validate_intervals(intervals: &[Interval]) -> Result<()> {
    intervals
        .iter()
        .enumerate()
        .try_for_each(|(index, interval)| interval.validate(index))
}

/// The availability verdict for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

impl AvailabilityResult {
    pub fn new(interval: Interval, available: bool) -> Self {
        Self {
            start: interval.start,
            end: interval.end,
            available,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }
}

/// A span the user declared available or unavailable by hand.
///
/// `available: None` means the span carries no opinion and leaves the slots it
/// touches untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAvailabilityInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub available: Option<bool>,
}

impl ManualAvailabilityInterval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub(crate) fn validate(&self, index: usize) -> Result<()> {
        if self.end < self.start {
            return Err(EngineError::InvalidManualInterval {
                index,
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}
