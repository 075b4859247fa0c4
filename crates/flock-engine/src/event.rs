//! Calendar events as the reducer sees them.
//!
//! An event is one occurrence source. Its [`EventKind`] decides how long each
//! occurrence lasts and whether more occurrences are generated from a rule.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::recurrence::{RRuleRecurrence, Recurrence};

/// Effective duration of an all-day occurrence, regardless of its literal span.
pub const ONE_DAY: Duration = Duration::days(1);

/// How an event's occurrences are derived.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// A single occurrence covering `start..end`.
    Timed,
    /// A single occurrence starting at `start` and lasting [`ONE_DAY`].
    AllDay,
    /// `start..end` is the template; the rule generates further starts.
    Recurring(Arc<dyn Recurrence>),
}

/// One event from an external calendar.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    /// Source identifier (the iCalendar `UID`), used only in diagnostics.
    pub uid: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
}

impl CalendarEvent {
    pub fn timed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            uid: None,
            start,
            end,
            kind: EventKind::Timed,
        }
    }

    pub fn all_day(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            uid: None,
            start,
            end,
            kind: EventKind::AllDay,
        }
    }

    pub fn recurring(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        recurrence: impl Recurrence + 'static,
    ) -> Self {
        Self {
            uid: None,
            start,
            end,
            kind: EventKind::Recurring(Arc::new(recurrence)),
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// The literal `end - start` span of the (template) occurrence.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.kind, EventKind::AllDay)
    }

    pub fn recurrence(&self) -> Option<&dyn Recurrence> {
        match &self.kind {
            EventKind::Recurring(rule) => Some(rule.as_ref()),
            _ => None,
        }
    }

    /// Reject events whose end precedes their start.
    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(EngineError::InvalidEvent {
                event: self.to_string(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uid {
            Some(uid) => write!(f, "'{}'", uid),
            None => write!(f, "starting {}", self.start),
        }
    }
}

/// A named list of events. The reducer flattens calendars and never looks at
/// the source again.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    pub source: String,
    pub events: Vec<CalendarEvent>,
}

impl Calendar {
    pub fn new(source: impl Into<String>, events: Vec<CalendarEvent>) -> Self {
        Self {
            source: source.into(),
            events,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde-friendly records for events crossing a process boundary
// ---------------------------------------------------------------------------

/// Plain-data form of a [`CalendarEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    /// RFC 5545 RRULE value; when present the event is recurring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
    /// IANA timezone the rule is expanded in. Defaults to UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exdates: Vec<DateTime<Utc>>,
}

impl TryFrom<EventRecord> for CalendarEvent {
    type Error = EngineError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let kind = match record.rrule.as_deref() {
            Some(rule) => {
                let timezone = record.timezone.as_deref().unwrap_or("UTC");
                let recurrence =
                    RRuleRecurrence::new(rule, record.start, timezone, &record.exdates)?;
                EventKind::Recurring(Arc::new(recurrence))
            }
            None if record.all_day => EventKind::AllDay,
            None => EventKind::Timed,
        };

        let event = CalendarEvent {
            uid: record.uid,
            start: record.start,
            end: record.end,
            kind,
        };
        event.validate()?;
        Ok(event)
    }
}

/// Plain-data form of a [`Calendar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub source: String,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl TryFrom<CalendarRecord> for Calendar {
    type Error = EngineError;

    fn try_from(record: CalendarRecord) -> Result<Self> {
        let events = record
            .events
            .into_iter()
            .map(CalendarEvent::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Calendar::new(record.source, events))
    }
}
