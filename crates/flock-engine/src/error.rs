//! Error types for flock-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid interval at index {index}: start {start} is not before end {end}")]
    InvalidInterval {
        index: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid event {event}: end {end} is before start {start}")]
    InvalidEvent {
        event: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid manual availability at index {index}: end {end} is before start {start}")]
    InvalidManualInterval {
        index: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Expansion error: {0}")]
    Expansion(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("iCalendar parse error at content line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
