//! Fold every event of every calendar into one availability flag per slot.
//!
//! Slots start available; any event occurrence overlapping a slot makes it
//! unavailable. Calendars are flattened first, so the source of an event never
//! matters.
//!
//! Recurring events need one extra piece of state. Rule expansion only reports
//! occurrences whose *start* falls in the queried slot, so a 30-minute meeting
//! starting in the 09:30 slot is invisible when the 09:45 slot is expanded.
//! Each recurring event therefore keeps an `OccurrenceCarry` of every start
//! it has produced so far in this pass, and a slot with no fresh occurrences
//! consults it instead.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use crate::error::Result;
use crate::event::{Calendar, CalendarEvent, EventKind, ONE_DAY};
use crate::interval::{validate_intervals, AvailabilityResult, Interval};
use crate::overlap::{occurs_during, starts_before_or_at_interval};
use crate::recurrence::Recurrence;

/// Compute one availability verdict per slot from a set of calendars.
///
/// Results come back in the same order as `intervals`.
///
/// # Errors
/// Fails fast, without partial results, when a slot has `start >= end`
/// (`EngineError::InvalidInterval`), an event ends before it starts
/// (`EngineError::InvalidEvent`), or a recurrence cannot be expanded.
pub fn compute_availability(
    calendars: &[Calendar],
    intervals: &[Interval],
) -> Result<Vec<AvailabilityResult>> {
    validate_intervals(intervals)?;

    debug!(
        calendars = calendars.len(),
        intervals = intervals.len(),
        "computing availability"
    );

    let mut available = vec![true; intervals.len()];

    for event in calendars.iter().flat_map(|c| c.events.iter()) {
        event.validate()?;
        mark_event(event, intervals, &mut available)?;
    }

    Ok(intervals
        .iter()
        .zip(available)
        .map(|(interval, available)| AvailabilityResult::new(*interval, available))
        .collect())
}

/// Clear the flag of every slot `event` makes unavailable.
fn mark_event(
    event: &CalendarEvent,
    intervals: &[Interval],
    available: &mut [bool],
) -> Result<()> {
    match &event.kind {
        EventKind::AllDay => {
            trace!(%event, "all-day event");
            mark_span(event.start, ONE_DAY, intervals, available);
        }
        EventKind::Timed => {
            trace!(%event, "timed event");
            mark_span(event.start, event.duration(), intervals, available);
        }
        EventKind::Recurring(rule) => {
            trace!(%event, "recurring event");
            mark_recurring(rule.as_ref(), event.duration(), intervals, available)?;
        }
    }
    Ok(())
}

fn mark_span(
    start: DateTime<Utc>,
    duration: Duration,
    intervals: &[Interval],
    available: &mut [bool],
) {
    for (interval, flag) in intervals.iter().zip(available.iter_mut()) {
        if occurs_during(start, interval.start, interval.end, duration) {
            *flag = false;
        }
    }
}

fn mark_recurring(
    rule: &dyn Recurrence,
    duration: Duration,
    intervals: &[Interval],
    available: &mut [bool],
) -> Result<()> {
    let mut carry = OccurrenceCarry::default();

    for (interval, flag) in intervals.iter().zip(available.iter_mut()) {
        let occurrences = rule.occurrences_between(interval.start, interval.end)?;

        if occurrences.is_empty() {
            if carry.spans_into(interval, duration) {
                *flag = false;
            }
            continue;
        }

        // An occurrence landing exactly on the slot's end belongs to the next
        // slot; it is still recorded for the carry.
        if occurrences.iter().any(|start| *start != interval.end) {
            *flag = false;
        }
        carry.record(occurrences);
    }

    Ok(())
}

/// Occurrence starts one recurring event has produced so far in a single pass,
/// in slot-processing order.
///
/// Scoped to one event: occurrences of different events are never mixed.
#[derive(Debug, Default)]
struct OccurrenceCarry {
    seen: Vec<DateTime<Utc>>,
}

impl OccurrenceCarry {
    fn record(&mut self, occurrences: impl IntoIterator<Item = DateTime<Utc>>) {
        self.seen.extend(occurrences);
    }

    /// Whether any recorded occurrence began at or before `interval.start`
    /// and is still running then.
    fn spans_into(&self, interval: &Interval, duration: Duration) -> bool {
        self.seen
            .iter()
            .any(|start| starts_before_or_at_interval(*start, interval.start, duration))
    }
}
