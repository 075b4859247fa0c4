//! Tests for reading iCalendar text into calendar events.

use chrono::{DateTime, Duration, TimeZone, Utc};
use flock_engine::{
    compute_availability, parse_calendar, EngineError, EventKind, Interval, Recurrence,
};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn wrap(body: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//flock//test//EN\r\n{}END:VCALENDAR\r\n",
        body
    )
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

#[test]
fn utc_event_is_timed() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nUID:standup@flock\r\nDTSTART:20260302T092000Z\r\nDTEND:20260302T095000Z\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.source, "work");
    assert_eq!(calendar.events.len(), 1);
    let event = &calendar.events[0];
    assert_eq!(event.uid.as_deref(), Some("standup@flock"));
    assert_eq!(event.start, utc(2026, 3, 2, 9, 20));
    assert_eq!(event.end, utc(2026, 3, 2, 9, 50));
    assert!(matches!(event.kind, EventKind::Timed));
}

#[test]
fn date_valued_event_is_all_day() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nUID:holiday\r\nDTSTART;VALUE=DATE:20240301\r\nDTEND;VALUE=DATE:20240302\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("holidays", &ics, "UTC").unwrap();
    let event = &calendar.events[0];

    assert!(event.is_all_day());
    assert_eq!(event.start, utc(2024, 3, 1, 0, 0));
    assert_eq!(event.end, utc(2024, 3, 2, 0, 0));
}

#[test]
fn date_valued_event_starts_at_local_midnight() {
    // Helsinki is UTC+2 in March
    let ics = wrap("BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20240301\r\nEND:VEVENT\r\n");

    let calendar = parse_calendar("holidays", &ics, "Europe/Helsinki").unwrap();
    let event = &calendar.events[0];

    assert_eq!(event.start, utc(2024, 2, 29, 22, 0));
    assert_eq!(event.end, event.start + Duration::days(1));
}

#[test]
fn rrule_makes_event_recurring() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nDTSTART:20260302T093000Z\r\nDTEND:20260302T100000Z\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();
    let rule = calendar.events[0]
        .recurrence()
        .expect("event should be recurring");

    let hits = rule
        .occurrences_between(utc(2026, 3, 1, 0, 0), utc(2026, 3, 31, 0, 0))
        .unwrap();
    assert_eq!(hits.len(), 3);
}

// ---------------------------------------------------------------------------
// Time resolution
// ---------------------------------------------------------------------------

#[test]
fn tzid_local_time_is_converted_to_utc() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nDTSTART;TZID=America/New_York:20260302T090000\r\nDTEND;TZID=America/New_York:20260302T100000\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();
    let event = &calendar.events[0];

    assert_eq!(event.start, utc(2026, 3, 2, 14, 0));
    assert_eq!(event.end, utc(2026, 3, 2, 15, 0));
}

#[test]
fn floating_time_uses_default_timezone() {
    let ics = wrap("BEGIN:VEVENT\r\nDTSTART:20260302T090000\r\nDTEND:20260302T100000\r\nEND:VEVENT\r\n");

    let calendar = parse_calendar("work", &ics, "Asia/Tokyo").unwrap();

    assert_eq!(calendar.events[0].start, utc(2026, 3, 2, 0, 0));
}

#[test]
fn calendar_timezone_overrides_default_for_floating_times() {
    let ics = wrap(
        "X-WR-TIMEZONE:Asia/Tokyo\r\nBEGIN:VEVENT\r\nDTSTART:20260302T090000\r\nDTEND:20260302T100000\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.events[0].start, utc(2026, 3, 2, 0, 0));
}

#[test]
fn unknown_tzid_falls_back_to_default() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nDTSTART;TZID=\"Pacific Standard Time\":20260302T090000\r\nDTEND;TZID=\"Pacific Standard Time\":20260302T100000\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("outlook", &ics, "UTC").unwrap();

    assert_eq!(calendar.events[0].start, utc(2026, 3, 2, 9, 0));
}

#[test]
fn missing_dtend_uses_duration() {
    let ics = wrap("BEGIN:VEVENT\r\nDTSTART:20260302T090000Z\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\n");

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.events[0].end, utc(2026, 3, 2, 10, 30));
}

#[test]
fn missing_dtend_and_duration_is_zero_length_for_date_times() {
    let ics = wrap("BEGIN:VEVENT\r\nDTSTART:20260302T090000Z\r\nEND:VEVENT\r\n");

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.events[0].end, calendar.events[0].start);
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn folded_lines_are_joined() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nUID:a-very-long-\r\n identifier@flock\r\nDTSTART:20260302T0900\r\n\t00Z\r\nDTEND:20260302T100000Z\r\nEND:VEVENT\r\n",
    );

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();
    let event = &calendar.events[0];

    assert_eq!(event.uid.as_deref(), Some("a-very-long-identifier@flock"));
    assert_eq!(event.start, utc(2026, 3, 2, 9, 0));
}

#[test]
fn bare_lf_line_endings_are_accepted() {
    let ics = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nDTSTART:20260302T090000Z\nDTEND:20260302T100000Z\nEND:VEVENT\nEND:VCALENDAR\n";

    let calendar = parse_calendar("work", ics, "UTC").unwrap();

    assert_eq!(calendar.events.len(), 1);
}

#[test]
fn non_event_components_are_skipped() {
    let ics = wrap(concat!(
        "BEGIN:VTIMEZONE\r\nTZID:Europe/Helsinki\r\nBEGIN:STANDARD\r\nDTSTART:19701025T040000\r\nEND:STANDARD\r\nEND:VTIMEZONE\r\n",
        "BEGIN:VTODO\r\nDTSTART:20260302T090000Z\r\nEND:VTODO\r\n",
        "BEGIN:VEVENT\r\nDTSTART:20260302T110000Z\r\nDTEND:20260302T120000Z\r\nEND:VEVENT\r\n",
    ));

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.events.len(), 1);
    assert_eq!(calendar.events[0].start, utc(2026, 3, 2, 11, 0));
}

#[test]
fn alarm_properties_do_not_leak_into_event() {
    let ics = wrap(concat!(
        "BEGIN:VEVENT\r\nDTSTART:20260302T090000Z\r\nDTEND:20260302T100000Z\r\n",
        "BEGIN:VALARM\r\nTRIGGER:-PT15M\r\nDURATION:PT5M\r\nACTION:DISPLAY\r\nEND:VALARM\r\n",
        "END:VEVENT\r\n",
    ));

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.events[0].end, utc(2026, 3, 2, 10, 0));
}

#[test]
fn recurrence_overrides_are_skipped() {
    let ics = wrap(concat!(
        "BEGIN:VEVENT\r\nUID:series\r\nDTSTART:20260302T090000Z\r\nDTEND:20260302T100000Z\r\nRRULE:FREQ=DAILY\r\nEND:VEVENT\r\n",
        "BEGIN:VEVENT\r\nUID:series\r\nRECURRENCE-ID:20260303T090000Z\r\nDTSTART:20260303T150000Z\r\nDTEND:20260303T160000Z\r\nEND:VEVENT\r\n",
    ));

    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    assert_eq!(calendar.events.len(), 1);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn recurring_event_with_exdate_drives_availability() {
    let ics = wrap(concat!(
        "BEGIN:VEVENT\r\nUID:sync\r\n",
        "DTSTART;TZID=Europe/Helsinki:20260302T113000\r\n",
        "DTEND;TZID=Europe/Helsinki:20260302T120000\r\n",
        "RRULE:FREQ=DAILY;UNTIL=20260306T235959Z\r\n",
        "EXDATE;TZID=Europe/Helsinki:20260303T113000\r\n",
        "END:VEVENT\r\n",
    ));
    let calendar = parse_calendar("work", &ics, "UTC").unwrap();

    // 11:30 Helsinki is 09:30Z in March (before EU DST)
    let slot = |d: u32, h: u32, m: u32| {
        let start = utc(2026, 3, d, h, m);
        Interval {
            start,
            end: start + Duration::minutes(15),
        }
    };
    let intervals = vec![slot(2, 9, 30), slot(2, 9, 45), slot(3, 9, 30), slot(4, 9, 30)];

    let results = compute_availability(&[calendar], &intervals).unwrap();
    let flags: Vec<bool> = results.iter().map(|r| r.available).collect();

    assert_eq!(flags, vec![false, false, true, false]);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn event_without_dtstart_is_a_parse_error() {
    let ics = wrap("BEGIN:VEVENT\r\nUID:nowhere\r\nEND:VEVENT\r\n");

    let err = parse_calendar("work", &ics, "UTC").unwrap_err();

    match err {
        EngineError::Parse { line, message } => {
            assert_eq!(line, 4);
            assert!(message.contains("DTSTART"));
        }
        other => panic!("expected Parse, got {:?}", other),
    }
}

#[test]
fn unterminated_event_is_a_parse_error() {
    let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:20260302T090000Z\r\n";

    let err = parse_calendar("work", ics, "UTC").unwrap_err();

    assert!(matches!(err, EngineError::Parse { line: 2, .. }));
}

#[test]
fn malformed_date_is_a_parse_error() {
    let ics = wrap("BEGIN:VEVENT\r\nDTSTART:2026-03-02 09:00\r\nEND:VEVENT\r\n");

    let err = parse_calendar("work", &ics, "UTC").unwrap_err();

    assert!(matches!(err, EngineError::Parse { .. }));
}

#[test]
fn bad_rrule_is_an_invalid_rule() {
    let ics = wrap(
        "BEGIN:VEVENT\r\nDTSTART:20260302T090000Z\r\nDTEND:20260302T100000Z\r\nRRULE:FREQ=SOMETIMES\r\nEND:VEVENT\r\n",
    );

    let err = parse_calendar("work", &ics, "UTC").unwrap_err();

    assert!(matches!(err, EngineError::InvalidRule(_)));
}

#[test]
fn unknown_default_timezone_is_rejected() {
    let err = parse_calendar("work", &wrap(""), "Nowhere/Special").unwrap_err();
    assert!(matches!(err, EngineError::InvalidTimezone(_)));
}
