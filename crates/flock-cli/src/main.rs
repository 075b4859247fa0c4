//! `flock` CLI: build slot grids and compute availability from calendars.
//!
//! ## Usage
//!
//! ```sh
//! # A working week of 15-minute slots in Helsinki time
//! flock grid --start-date 2026-03-02 --end-date 2026-03-06 \
//!     --start-hour 9 --end-hour 17 --timezone Europe/Helsinki -o week.json
//!
//! # Availability against two calendars
//! flock availability --ics work.ics --ics home.ics -i week.json
//!
//! # Grid piped straight into availability, with manual overrides on top
//! flock grid --start-date 2026-03-02 --end-date 2026-03-02 --start-hour 9 --end-hour 12 \
//!     | flock availability --ics work.ics --manual overrides.json
//!
//! # Manual overrides only
//! flock manual --overrides overrides.json -i week.json
//! ```
//!
//! Logs go to stderr. Set `RUST_LOG` or `--log-level` to see them.

mod telemetry;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use flock_engine::{
    apply_manual_overrides, build_interval_grid, compute_availability, overlay_manual_overrides,
    parse_calendar, Calendar, CalendarRecord, GridSpec, Interval, ManualAvailabilityInterval,
    DEFAULT_SLOT_MINUTES,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(
    name = "flock",
    version,
    about = "Per-slot availability from iCalendar events and manual overrides"
)]
struct Cli {
    /// Log verbosity when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    /// Emit logs as newline-delimited JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut a date range into consecutive slots
    Grid {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,
        /// Local hour each day's window opens
        #[arg(long)]
        start_hour: u32,
        /// Local hour each day's window closes (at most 24)
        #[arg(long)]
        end_hour: u32,
        /// Slot width in minutes
        #[arg(long, env = "FLOCK_SLOT_MINUTES", default_value_t = DEFAULT_SLOT_MINUTES)]
        slot_minutes: u32,
        /// IANA timezone the window is expressed in
        #[arg(long, env = "FLOCK_TIMEZONE", default_value = "UTC")]
        timezone: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute availability for each slot from calendars
    Availability {
        /// iCalendar file; repeat for several calendars
        #[arg(long = "ics")]
        ics: Vec<PathBuf>,
        /// JSON file holding an array of calendar records
        #[arg(long)]
        events: Option<PathBuf>,
        /// JSON slot array (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// JSON manual overrides applied on top of the calendar verdicts
        #[arg(long)]
        manual: Option<PathBuf>,
        /// Timezone for floating iCalendar times
        #[arg(long, env = "FLOCK_TIMEZONE", default_value = "UTC")]
        timezone: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute availability for each slot from manual overrides alone
    Manual {
        /// JSON array of manual availability spans
        #[arg(long)]
        overrides: PathBuf,
        /// JSON slot array (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs, cli.log_level);

    match cli.command {
        Commands::Grid {
            start_date,
            end_date,
            start_hour,
            end_hour,
            slot_minutes,
            timezone,
            output,
        } => {
            let spec = GridSpec {
                start_date,
                end_date,
                start_hour,
                end_hour,
                slot_minutes,
                timezone,
            };
            let intervals = build_interval_grid(&spec).context("Failed to build interval grid")?;
            write_json(output.as_deref(), &intervals)?;
        }
        Commands::Availability {
            ics,
            events,
            input,
            manual,
            timezone,
            output,
        } => {
            let mut calendars = Vec::with_capacity(ics.len() + 1);
            for path in &ics {
                calendars.push(load_ics(path, &timezone)?);
            }
            if let Some(path) = events.as_deref() {
                let records: Vec<CalendarRecord> = read_json(Some(path))?;
                for record in records {
                    let source = record.source.clone();
                    let calendar = Calendar::try_from(record)
                        .with_context(|| format!("Invalid calendar record '{}'", source))?;
                    calendars.push(calendar);
                }
            }
            if calendars.is_empty() {
                warn!("no calendars given; every slot will be available");
            }

            let intervals: Vec<Interval> = read_json(input.as_deref())?;
            let mut results = compute_availability(&calendars, &intervals)
                .context("Failed to compute availability")?;

            if let Some(path) = manual.as_deref() {
                let spans: Vec<ManualAvailabilityInterval> = read_json(Some(path))?;
                results = overlay_manual_overrides(&spans, &results)
                    .context("Failed to apply manual overrides")?;
            }

            info!(
                slots = results.len(),
                available = results.iter().filter(|r| r.available).count(),
                "availability computed"
            );
            write_json(output.as_deref(), &results)?;
        }
        Commands::Manual {
            overrides,
            input,
            output,
        } => {
            let spans: Vec<ManualAvailabilityInterval> = read_json(Some(&overrides))?;
            let intervals: Vec<Interval> = read_json(input.as_deref())?;
            let results = apply_manual_overrides(&spans, &intervals)
                .context("Failed to apply manual overrides")?;
            write_json(output.as_deref(), &results)?;
        }
    }

    Ok(())
}

fn load_ics(path: &Path, timezone: &str) -> Result<Calendar> {
    let text = read_input(Some(path))?;
    parse_calendar(&path.display().to_string(), &text, timezone)
        .with_context(|| format!("Failed to parse calendar: {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let text = read_input(path)?;
    let source = path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", source))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut pretty = serde_json::to_string_pretty(value)?;
    pretty.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, pretty)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        None => {
            print!("{}", pretty);
        }
    }
    Ok(())
}
