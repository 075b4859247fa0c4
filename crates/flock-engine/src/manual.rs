//! Overlay hand-declared availability on a grid of slots.
//!
//! Manual spans are applied in order, so a later span wins over an earlier one
//! for every slot both touch. A span with `available: None` has no opinion and
//! changes nothing. Combining the result with calendar-derived availability is
//! left to the caller.

use tracing::debug;

use crate::error::Result;
use crate::interval::{
    validate_intervals, AvailabilityResult, Interval, ManualAvailabilityInterval,
};
use crate::overlap::occurs_during;

/// Apply manual spans over an "always available" grid built from `targets`.
///
/// # Errors
/// Returns `EngineError::InvalidInterval` for a target with `start >= end` and
/// `EngineError::InvalidManualInterval` for a manual span ending before it
/// starts.
pub fn apply_manual_overrides(
    manual: &[ManualAvailabilityInterval],
    targets: &[Interval],
) -> Result<Vec<AvailabilityResult>> {
    let base: Vec<AvailabilityResult> = targets
        .iter()
        .map(|interval| AvailabilityResult::new(*interval, true))
        .collect();

    overlay_manual_overrides(manual, &base)
}

/// Apply manual spans on top of an existing set of verdicts, such as the
/// output of [`compute_availability`](crate::reducer::compute_availability).
///
/// Overlapping spans replace the base verdict in either direction.
///
/// # Errors
/// Same preconditions as [`apply_manual_overrides`], checked on the slots of
/// `base`.
pub fn overlay_manual_overrides(
    manual: &[ManualAvailabilityInterval],
    base: &[AvailabilityResult],
) -> Result<Vec<AvailabilityResult>> {
    let targets: Vec<Interval> = base.iter().map(AvailabilityResult::interval).collect();
    validate_intervals(&targets)?;
    for (index, span) in manual.iter().enumerate() {
        span.validate(index)?;
    }

    debug!(
        manual = manual.len(),
        intervals = base.len(),
        "applying manual availability"
    );

    let mut results = base.to_vec();

    for span in manual {
        let Some(available) = span.available else {
            continue;
        };
        let duration = span.duration();

        for result in results.iter_mut() {
            if occurs_during(span.start, result.start, result.end, duration) {
                result.available = available;
            }
        }
    }

    Ok(results)
}
