//! WASM bindings for flock-engine.
//!
//! Exposes availability computation, manual overrides and slot grids to
//! JavaScript via `wasm-bindgen`. Every argument and result crosses the
//! boundary as a JSON string; errors are thrown as plain strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p flock-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/flock-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/flock_engine_wasm.wasm
//! ```

use flock_engine::{
    apply_manual_overrides, build_interval_grid, compute_availability, parse_calendar, Calendar,
    CalendarRecord, GridSpec, Interval, ManualAvailabilityInterval,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// One iCalendar document passed from JavaScript.
#[derive(Deserialize)]
struct IcsInput {
    source: String,
    ics: String,
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn from_json<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn calendars_from_records(json: &str) -> Result<Vec<Calendar>, String> {
    let records: Vec<CalendarRecord> = from_json(json, "calendars")?;
    records
        .into_iter()
        .map(|record| Calendar::try_from(record).map_err(|e| e.to_string()))
        .collect()
}

fn calendars_from_ics(json: &str, default_timezone: &str) -> Result<Vec<Calendar>, String> {
    let inputs: Vec<IcsInput> = from_json(json, "iCalendar")?;
    inputs
        .iter()
        .map(|input| {
            parse_calendar(&input.source, &input.ics, default_timezone)
                .map_err(|e| format!("{}: {}", input.source, e))
        })
        .collect()
}

fn availability(calendars: &[Calendar], intervals_json: &str) -> Result<String, String> {
    let intervals: Vec<Interval> = from_json(intervals_json, "intervals")?;
    let results = compute_availability(calendars, &intervals).map_err(|e| e.to_string())?;
    to_json(&results)
}

fn manual(manual_json: &str, intervals_json: &str) -> Result<String, String> {
    let spans: Vec<ManualAvailabilityInterval> = from_json(manual_json, "manual availability")?;
    let intervals: Vec<Interval> = from_json(intervals_json, "intervals")?;
    let results = apply_manual_overrides(&spans, &intervals).map_err(|e| e.to_string())?;
    to_json(&results)
}

fn grid(grid_json: &str) -> Result<String, String> {
    let spec: GridSpec = from_json(grid_json, "grid")?;
    let intervals = build_interval_grid(&spec).map_err(|e| e.to_string())?;
    to_json(&intervals)
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Compute one availability verdict per slot from calendar records.
///
/// `calendars_json` is an array of `{source, events: [{start, end, all_day?,
/// rrule?, timezone?, exdates?}]}`; `intervals_json` an array of `{start, end}`.
/// Returns an array of `{start, end, available}` in slot order.
#[wasm_bindgen(js_name = "computeAvailability")]
pub fn compute_availability_js(
    calendars_json: &str,
    intervals_json: &str,
) -> Result<String, JsValue> {
    calendars_from_records(calendars_json)
        .and_then(|calendars| availability(&calendars, intervals_json))
        .map_err(|e| JsValue::from_str(&e))
}

/// Same as `computeAvailability`, reading calendars from iCalendar text.
///
/// `ics_json` is an array of `{source, ics}`. Floating times and unknown
/// TZIDs resolve in `default_timezone`.
#[wasm_bindgen(js_name = "computeAvailabilityFromIcs")]
pub fn compute_availability_from_ics(
    ics_json: &str,
    intervals_json: &str,
    default_timezone: &str,
) -> Result<String, JsValue> {
    calendars_from_ics(ics_json, default_timezone)
        .and_then(|calendars| availability(&calendars, intervals_json))
        .map_err(|e| JsValue::from_str(&e))
}

/// Availability from manual spans alone; later spans win.
#[wasm_bindgen(js_name = "applyManualOverrides")]
pub fn apply_manual_overrides_js(
    manual_json: &str,
    intervals_json: &str,
) -> Result<String, JsValue> {
    manual(manual_json, intervals_json).map_err(|e| JsValue::from_str(&e))
}

/// Build a slot grid from `{start_date, end_date, start_hour, end_hour,
/// slot_minutes?, timezone?}`.
#[wasm_bindgen(js_name = "buildIntervalGrid")]
pub fn build_interval_grid_js(grid_json: &str) -> Result<String, JsValue> {
    grid(grid_json).map_err(|e| JsValue::from_str(&e))
}
