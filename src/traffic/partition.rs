//! Day/night and weekday/weekend partitioning

use crate::structs::{
    CalendarFields, DerivedRow, DerivedTable, PartitionScheme, Partitions, Result,
};
use std::collections::BTreeMap;
use tracing::debug;

/// First hour counted as daytime (inclusive)
pub const DAY_START_HOUR: u32 = 7;
/// First hour counted as nighttime (inclusive)
pub const NIGHT_START_HOUR: u32 = 19;
/// Last weekday counted as a business day (4 = Friday)
pub const LAST_BUSINESS_DAY: u32 = 4;

/// Hour in [7, 19)
#[must_use]
pub fn is_daytime(hour: u32) -> bool {
    (DAY_START_HOUR..NIGHT_START_HOUR).contains(&hour)
}

/// Monday through Friday
#[must_use]
pub fn is_business_day(dayofweek: u32) -> bool {
    dayofweek <= LAST_BUSINESS_DAY
}

impl PartitionScheme {
    /// Partition a row with these calendar fields lands in
    #[must_use]
    pub fn assign(self, calendar: &CalendarFields) -> &'static str {
        let [first, second] = self.names();
        let in_first = match self {
            Self::DayNight => is_daytime(calendar.hour),
            Self::Weekday => is_business_day(calendar.dayofweek),
        };
        if in_first {
            first
        } else {
            second
        }
    }
}

/// Split a table into the disjoint partitions of `scheme`, preserving row order.
///
/// Both partitions are always present, possibly empty.
#[must_use]
pub fn partition(table: &DerivedTable, scheme: PartitionScheme) -> Partitions {
    let mut parts: BTreeMap<&'static str, DerivedTable> = scheme
        .names()
        .into_iter()
        .map(|name| (name, DerivedTable::default()))
        .collect();

    for row in &table.rows {
        parts
            .entry(scheme.assign(&row.calendar))
            .or_default()
            .rows
            .push(row.clone());
    }

    for (name, part) in &parts {
        debug!(scheme = %scheme, partition = name, rows = part.len(), "partitioned");
    }
    Partitions { scheme, parts }
}

/// Partition by scheme name
///
/// # Errors
/// Returns a configuration error if the scheme name is not recognized
pub fn partition_by_name(table: &DerivedTable, scheme: &str) -> Result<Partitions> {
    Ok(partition(table, scheme.parse()?))
}

/// Rows matching `predicate`, in input order
#[must_use]
pub fn select<F>(table: &DerivedTable, predicate: F) -> DerivedTable
where
    F: Fn(&DerivedRow) -> bool,
{
    DerivedTable {
        rows: table.rows.iter().filter(|r| predicate(*r)).cloned().collect(),
    }
}
