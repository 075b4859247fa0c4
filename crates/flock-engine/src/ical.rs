//! Read `VEVENT`s out of iCalendar text (RFC 5545) into [`CalendarEvent`]s.
//!
//! Only what availability needs is read: `DTSTART`, `DTEND` or `DURATION`,
//! `RRULE`, `EXDATE` and `UID`. Everything else, including whole components
//! other than `VEVENT`, is skipped.
//!
//! Times are resolved as follows:
//! - `VALUE=DATE` or 8-digit values are dates: local midnight, all-day event
//! - values ending in `Z` are UTC
//! - other values are local time in their `TZID`, or in the calendar's
//!   `X-WR-TIMEZONE`, or in the caller's default timezone

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::event::{Calendar, CalendarEvent, EventKind, ONE_DAY};
use crate::recurrence::RRuleRecurrence;

const ICAL_DATE: &str = "%Y%m%d";
const ICAL_DATETIME: &str = "%Y%m%dT%H%M%S";

/// Parse iCalendar text into a [`Calendar`] named `source`.
///
/// `default_timezone` is the IANA timezone for floating times when the
/// calendar declares none.
///
/// # Errors
/// Returns `EngineError::InvalidTimezone` for an unknown `default_timezone`,
/// `EngineError::Parse` for malformed content lines, values, a `VEVENT`
/// without `DTSTART` or one left open, `EngineError::InvalidRule` for a bad
/// `RRULE`, and `EngineError::InvalidEvent` for an event ending before it
/// starts.
pub fn parse_calendar(source: &str, ics: &str, default_timezone: &str) -> Result<Calendar> {
    let mut calendar_tz: Tz = default_timezone
        .parse()
        .map_err(|_| EngineError::InvalidTimezone(default_timezone.to_string()))?;

    let mut events = Vec::new();
    let mut skipped = 0usize;
    let mut current: Option<EventBuilder> = None;
    // Components opened inside the current VEVENT (e.g. VALARM).
    let mut nested: Vec<String> = Vec::new();

    for (number, text) in unfold(ics) {
        let line = ContentLine::parse(number, &text)?;

        match line.name.as_str() {
            "BEGIN" => {
                if current.is_some() {
                    nested.push(line.value.to_ascii_uppercase());
                } else if line.value.eq_ignore_ascii_case("VEVENT") {
                    current = Some(EventBuilder::new(number));
                }
            }
            "END" if current.is_some() => {
                if nested.pop().is_some() {
                    continue;
                }
                if !line.value.eq_ignore_ascii_case("VEVENT") {
                    return Err(EngineError::Parse {
                        line: number,
                        message: format!("unexpected END:{} inside VEVENT", line.value),
                    });
                }
                if let Some(builder) = current.take() {
                    match builder.finish()? {
                        Some(event) => events.push(event),
                        None => skipped += 1,
                    }
                }
            }
            "X-WR-TIMEZONE" if current.is_none() => {
                calendar_tz = resolve_tzid(line.value, calendar_tz);
            }
            _ => {
                if let Some(builder) = current.as_mut() {
                    if nested.is_empty() {
                        builder.apply(&line, calendar_tz)?;
                    }
                }
            }
        }
    }

    if let Some(builder) = current {
        return Err(EngineError::Parse {
            line: builder.begin_line,
            message: "VEVENT is never closed".to_string(),
        });
    }

    debug!(
        source,
        events = events.len(),
        skipped,
        "parsed calendar"
    );

    Ok(Calendar::new(source, events))
}

/// Join folded lines (a line break followed by a space or tab continues the
/// previous line), tagging each logical line with its first physical line.
fn unfold(ics: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (index, raw) in ics.lines().enumerate() {
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some((_, previous)) = lines.last_mut() {
                previous.push_str(rest);
                continue;
            }
        }
        if raw.trim().is_empty() {
            continue;
        }
        lines.push((index + 1, raw.to_string()));
    }

    lines
}

/// `NAME;PARAM=VALUE;...:VALUE`
#[derive(Debug)]
struct ContentLine<'a> {
    number: usize,
    name: String,
    params: Vec<(String, &'a str)>,
    value: &'a str,
}

impl<'a> ContentLine<'a> {
    fn parse(number: usize, text: &'a str) -> Result<Self> {
        let colon = find_unquoted(text, ':').ok_or_else(|| EngineError::Parse {
            line: number,
            message: format!("missing ':' in content line '{}'", text),
        })?;
        let (head, value) = (&text[..colon], &text[colon + 1..]);

        let mut segments = split_unquoted(head, ';').into_iter();
        let name = segments.next().unwrap_or_default().trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(EngineError::Parse {
                line: number,
                message: "content line without a property name".to_string(),
            });
        }

        let params = segments
            .filter_map(|segment| segment.split_once('='))
            .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.trim().trim_matches('"')))
            .collect();

        Ok(Self {
            number,
            name,
            params,
            value: value.trim(),
        })
    }

    fn param(&self, key: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| *value)
    }

    fn is_date_valued(&self) -> bool {
        self.param("VALUE")
            .is_some_and(|value| value.eq_ignore_ascii_case("DATE"))
    }
}

fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut quoted = false;
    for (index, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == needle && !quoted => return Some(index),
            _ => {}
        }
    }
    None
}

fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(index) = find_unquoted(rest, separator) {
        parts.push(&rest[..index]);
        rest = &rest[index + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Resolve a `TZID` to an IANA timezone, falling back when it is unknown
/// (e.g. a Windows zone name).
fn resolve_tzid(tzid: &str, fallback: Tz) -> Tz {
    let name = tzid.trim().trim_matches('"').trim_start_matches('/');
    name.parse().unwrap_or_else(|_| {
        warn!(tzid = name, fallback = %fallback, "unknown TZID, using fallback timezone");
        fallback
    })
}

/// A resolved `DTSTART`/`DTEND`/`EXDATE` value.
#[derive(Debug, Clone, Copy)]
struct TimeValue {
    instant: DateTime<Utc>,
    is_date: bool,
    tz: Tz,
}

fn parse_time_value(text: &str, date_valued: bool, tz: Tz, line: usize) -> Result<TimeValue> {
    let text = text.trim();
    let invalid = || EngineError::Parse {
        line,
        message: format!("invalid date-time value '{}'", text),
    };

    if date_valued || text.len() == 8 {
        let date = NaiveDate::parse_from_str(text, ICAL_DATE).map_err(|_| invalid())?;
        let instant = local_to_utc(tz, date.and_time(NaiveTime::MIN)).ok_or_else(invalid)?;
        return Ok(TimeValue {
            instant,
            is_date: true,
            tz,
        });
    }

    if let Some(utc) = text.strip_suffix('Z') {
        let instant = NaiveDateTime::parse_from_str(utc, ICAL_DATETIME)
            .map_err(|_| invalid())?
            .and_utc();
        return Ok(TimeValue {
            instant,
            is_date: false,
            tz: chrono_tz::UTC,
        });
    }

    let local = NaiveDateTime::parse_from_str(text, ICAL_DATETIME).map_err(|_| invalid())?;
    let instant = local_to_utc(tz, local).ok_or_else(invalid)?;
    Ok(TimeValue {
        instant,
        is_date: false,
        tz,
    })
}

/// Map a local time to UTC; a time inside a DST gap moves forward an hour.
fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC 5545 §3.3.6 duration, e.g. `PT1H30M`, `P1D`, `-P2W`.
fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (sign, rest) = match text.chars().next()? {
        '-' => (-1, &text[1..]),
        '+' => (1, &text[1..]),
        _ => (1, text),
    };
    let rest = rest.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut in_time = false;
    let mut saw_unit = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' if digits.is_empty() => in_time = true,
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                total = total + match (c, in_time) {
                    ('W', false) => Duration::weeks(n),
                    ('D', false) => Duration::days(n),
                    ('H', true) => Duration::hours(n),
                    ('M', true) => Duration::minutes(n),
                    ('S', true) => Duration::seconds(n),
                    _ => return None,
                };
                saw_unit = true;
            }
            _ => return None,
        }
    }

    (saw_unit && digits.is_empty()).then(|| total * sign)
}

/// Properties of one `VEVENT`, collected until its `END`.
#[derive(Debug)]
struct EventBuilder {
    begin_line: usize,
    uid: Option<String>,
    dtstart: Option<TimeValue>,
    dtend: Option<TimeValue>,
    duration: Option<Duration>,
    rrule: Option<String>,
    exdates: Vec<DateTime<Utc>>,
    is_override: bool,
}

impl EventBuilder {
    fn new(begin_line: usize) -> Self {
        Self {
            begin_line,
            uid: None,
            dtstart: None,
            dtend: None,
            duration: None,
            rrule: None,
            exdates: Vec::new(),
            is_override: false,
        }
    }

    fn apply(&mut self, line: &ContentLine<'_>, calendar_tz: Tz) -> Result<()> {
        let tz = line
            .param("TZID")
            .map_or(calendar_tz, |tzid| resolve_tzid(tzid, calendar_tz));

        match line.name.as_str() {
            "UID" => self.uid = Some(line.value.to_string()),
            "DTSTART" => {
                self.dtstart = Some(parse_time_value(
                    line.value,
                    line.is_date_valued(),
                    tz,
                    line.number,
                )?)
            }
            "DTEND" => {
                self.dtend = Some(parse_time_value(
                    line.value,
                    line.is_date_valued(),
                    tz,
                    line.number,
                )?)
            }
            "DURATION" => {
                let duration = parse_duration(line.value).ok_or_else(|| EngineError::Parse {
                    line: line.number,
                    message: format!("invalid duration '{}'", line.value),
                })?;
                self.duration = Some(duration);
            }
            "RRULE" => self.rrule = Some(line.value.to_string()),
            "EXDATE" => {
                for part in line.value.split(',').filter(|p| !p.trim().is_empty()) {
                    let value = parse_time_value(part, line.is_date_valued(), tz, line.number)?;
                    self.exdates.push(value.instant);
                }
            }
            "RECURRENCE-ID" => self.is_override = true,
            _ => {}
        }
        Ok(())
    }

    /// Build the event, or `None` for components the engine does not read.
    fn finish(self) -> Result<Option<CalendarEvent>> {
        if self.is_override {
            // Single-instance overrides of a recurring series are not applied.
            debug!(uid = ?self.uid, "skipping recurrence override");
            return Ok(None);
        }

        let start = self.dtstart.ok_or_else(|| EngineError::Parse {
            line: self.begin_line,
            message: "VEVENT without DTSTART".to_string(),
        })?;

        let end = match (self.dtend, self.duration) {
            (Some(end), _) => end.instant,
            (None, Some(duration)) => start.instant + duration,
            (None, None) if start.is_date => start.instant + ONE_DAY,
            (None, None) => start.instant,
        };

        let kind = match self.rrule.as_deref() {
            Some(rule) => EventKind::Recurring(Arc::new(RRuleRecurrence::new(
                rule,
                start.instant,
                start.tz.name(),
                &self.exdates,
            )?)),
            None if start.is_date => EventKind::AllDay,
            None => EventKind::Timed,
        };

        let event = CalendarEvent {
            uid: self.uid,
            start: start.instant,
            end,
            kind,
        };
        event.validate()?;
        Ok(Some(event))
    }
}
