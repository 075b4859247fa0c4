//! Recurrence expansion -- turns a recurrence rule into occurrence start times.
//!
//! The reducer only needs one capability from a rule: "give me every occurrence
//! start inside this window". [`Recurrence`] names that capability, and
//! [`RRuleRecurrence`] provides it on top of the `rrule` crate (v0.13) and
//! `chrono-tz`, expanding in the event's own timezone so wall-clock recurrences
//! survive DST transitions.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::warn;

use crate::error::{EngineError, Result};

/// Upper bound on occurrences returned for a single window.
const MAX_OCCURRENCES_PER_WINDOW: u16 = u16::MAX;

/// iCalendar basic date-time format without the trailing zone designator.
const ICAL_DATETIME: &str = "%Y%m%dT%H%M%S";

/// A source of occurrence start times.
pub trait Recurrence: fmt::Debug + Send + Sync {
    /// Every occurrence start `t` with `start <= t <= end`, in ascending order.
    ///
    /// # Errors
    /// Implementations return [`EngineError::Expansion`] when the rule cannot
    /// be evaluated for the window.
    fn occurrences_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>>;
}

/// An RFC 5545 recurrence set: one RRULE anchored at DTSTART, minus EXDATEs.
#[derive(Debug, Clone)]
pub struct RRuleRecurrence {
    rule: String,
    set: RRuleSet,
}

impl RRuleRecurrence {
    /// Parse a recurrence rule anchored at `dtstart`.
    ///
    /// # Arguments
    /// - `rrule` -- RFC 5545 RRULE value (e.g., "FREQ=WEEKLY;BYDAY=TU,TH"), with
    ///   or without a leading `RRULE:`
    /// - `dtstart` -- Start of the template occurrence
    /// - `timezone` -- IANA timezone the rule is evaluated in (e.g., "Europe/Helsinki")
    /// - `exdates` -- Occurrence starts excluded from the set
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRule` if the RRULE string is empty or unparseable.
    /// Returns `EngineError::InvalidTimezone` if the timezone is not a valid IANA identifier.
    pub fn new(
        rrule: &str,
        dtstart: DateTime<Utc>,
        timezone: &str,
        exdates: &[DateTime<Utc>],
    ) -> Result<Self> {
        let trimmed = rrule.trim();
        let trimmed = trimmed.strip_prefix("RRULE:").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(EngineError::InvalidRule("empty RRULE string".to_string()));
        }

        let tz: Tz = timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(timezone.to_string()))?;

        let rule = normalize_until(trimmed, tz)?;

        let mut rrule_text = format!(
            "DTSTART;TZID={}:{}\nRRULE:{}",
            tz.name(),
            local_ical(dtstart, tz),
            rule
        );

        if !exdates.is_empty() {
            let exdate_icals: Vec<String> = exdates.iter().map(|d| local_ical(*d, tz)).collect();
            rrule_text.push_str(&format!(
                "\nEXDATE;TZID={}:{}",
                tz.name(),
                exdate_icals.join(",")
            ));
        }

        let set: RRuleSet = rrule_text
            .parse()
            .map_err(|e| EngineError::InvalidRule(format!("{}", e)))?;

        Ok(Self { rule, set })
    }

    /// The normalised RRULE value this set was built from.
    pub fn rule(&self) -> &str {
        &self.rule
    }
}

impl Recurrence for RRuleRecurrence {
    fn occurrences_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        if start > end {
            return Ok(Vec::new());
        }

        // Widen the window by a second on each side and filter afterwards, so
        // both bounds are inclusive whatever the crate does at the edges.
        let margin = Duration::seconds(1);
        let window = self
            .set
            .clone()
            .after((start - margin).with_timezone(&rrule::Tz::UTC))
            .before((end + margin).with_timezone(&rrule::Tz::UTC));

        let result = window.all(MAX_OCCURRENCES_PER_WINDOW);
        if result.limited {
            warn!(
                rule = %self.rule,
                %start,
                %end,
                "recurrence expansion hit the per-window limit"
            );
        }

        Ok(result
            .dates
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .filter(|dt| *dt >= start && *dt <= end)
            .collect())
    }
}

/// Format an instant as a bare iCalendar local time in `tz`.
fn local_ical(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .naive_local()
        .format(ICAL_DATETIME)
        .to_string()
}

/// Rewrite any `UNTIL` part of the rule into the UTC form.
fn normalize_until(rrule: &str, tz: Tz) -> Result<String> {
    let parts = rrule
        .split(';')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                Ok(format!("UNTIL={}", until_as_utc(value, tz)?))
            }
            _ => Ok(part.to_string()),
        })
        .collect::<Result<Vec<String>>>()?;

    Ok(parts.join(";"))
}

fn until_as_utc(value: &str, tz: Tz) -> Result<String> {
    let invalid = || EngineError::InvalidRule(format!("invalid UNTIL value: {}", value));

    let until: DateTime<Utc> = if let Some(utc) = value.strip_suffix('Z') {
        NaiveDateTime::parse_from_str(utc, ICAL_DATETIME)
            .map_err(|_| invalid())?
            .and_utc()
    } else {
        // A date-only UNTIL includes every occurrence on that local day.
        let local = if value.len() == 8 {
            NaiveDate::parse_from_str(value, "%Y%m%d")
                .map_err(|_| invalid())?
                .and_hms_opt(23, 59, 59)
                .ok_or_else(invalid)?
        } else {
            NaiveDateTime::parse_from_str(value, ICAL_DATETIME).map_err(|_| invalid())?
        };
        tz.from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc())
    };

    Ok(format!("{}Z", until.format(ICAL_DATETIME)))
}
