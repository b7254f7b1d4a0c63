//! Timestamp parsing and calendar field derivation

use crate::structs::{
    CalendarFields, DerivedRow, DerivedTable, ParsePolicy, Parsed, Result, TrafficError,
    TrafficTable,
};
use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;

/// The single accepted `date_time` layout
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `date_time` value
///
/// # Errors
/// Returns a parse error carrying `row` if the value does not match [`TIMESTAMP_FORMAT`]
pub fn parse_timestamp(value: &str, row: usize) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        TrafficError::Parse {
            row,
            column: "date_time".to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Calendar fields of a timestamp
#[must_use]
pub fn calendar_fields(ts: &NaiveDateTime) -> CalendarFields {
    CalendarFields {
        hour: ts.hour(),
        dayofweek: ts.weekday().num_days_from_monday(),
        month: ts.month(),
        year: ts.year(),
    }
}

/// Attach parsed timestamps and calendar fields to every row.
///
/// The source table is left untouched; the result owns copies of the rows.
/// Errors and skipped rows carry each row's index in the input file.
///
/// # Errors
/// Returns a parse error for the first malformed timestamp under [`ParsePolicy::FailFast`]
pub fn derive(table: &TrafficTable, policy: ParsePolicy) -> Result<Parsed<DerivedTable>> {
    let mut rows = Vec::with_capacity(table.len());
    let mut skipped = Vec::new();

    for row in &table.rows {
        match parse_timestamp(&row.date_time, row.source_row) {
            Ok(timestamp) => rows.push(DerivedRow {
                source_index: row.source_row,
                timestamp,
                calendar: calendar_fields(&timestamp),
                row: row.clone(),
            }),
            Err(e) => policy.handle(e, &mut skipped)?,
        }
    }

    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        debug!(from = %first.timestamp, to = %last.timestamp, "timestamp range");
    }
    debug!(rows = rows.len(), skipped = skipped.len(), "derived calendar fields");
    Ok(Parsed {
        data: DerivedTable { rows },
        skipped,
    })
}
