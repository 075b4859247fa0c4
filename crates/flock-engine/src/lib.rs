//! # flock-engine
//!
//! Per-slot availability for group scheduling.
//!
//! Given a member's calendars and an ordered grid of time slots, the engine
//! answers one question per slot: is any event in the way? Recurring events
//! are expanded with the `rrule` crate in their own timezone, all-day events
//! block a full day, and manually declared spans can be overlaid on top.
//!
//! ## Modules
//!
//! - [`interval`]: Slots, per-slot verdicts and manual availability spans
//! - [`event`]: Calendar events, their kinds, and serde records for them
//! - [`recurrence`]: Recurrence capability trait and its RRULE implementation
//! - [`overlap`]: Half-open overlap tests
//! - [`reducer`]: One verdict per slot from calendars and slots
//! - [`manual`]: Manual availability overlay
//! - [`ical`]: Calendar events from iCalendar text
//! - [`grid`]: Slot grid from a date range and a daily hour window
//! - [`error`]: Error types

pub mod error;
pub mod event;
pub mod grid;
pub mod ical;
pub mod interval;
pub mod manual;
pub mod overlap;
pub mod recurrence;
pub mod reducer;

pub use error::EngineError;
pub use event::{Calendar, CalendarEvent, CalendarRecord, EventKind, EventRecord, ONE_DAY};
pub use grid::{build_interval_grid, GridSpec, DEFAULT_SLOT_MINUTES};
pub use ical::parse_calendar;
pub use interval::{AvailabilityResult, Interval, ManualAvailabilityInterval};
pub use manual::{apply_manual_overrides, overlay_manual_overrides};
pub use overlap::{occurs_during, starts_before_or_at_interval};
pub use recurrence::{RRuleRecurrence, Recurrence};
pub use reducer::compute_availability;
