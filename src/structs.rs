//! Consolidated public types for the i94 crate
//!
//! This module contains all public structs, enums, and error types used across the crate.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error: missing column(s) {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Parse error at row {row}, column {column}: {value:?} ({reason})")]
    Parse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Statistics error: {0}")]
    Stats(String),
}

pub type Result<T> = std::result::Result<T, TrafficError>;

/// How malformed rows are handled while loading and deriving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Abort the whole operation at the first malformed row
    #[default]
    FailFast,
    /// Drop malformed rows and report them
    SkipAndReport,
}

/// A row dropped under [`ParsePolicy::SkipAndReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub column: String,
    pub reason: String,
}

/// Output of a policy-governed parse step
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub data: T,
    pub skipped: Vec<SkippedRow>,
}

impl ParsePolicy {
    /// Apply the policy to a failed row.
    ///
    /// # Errors
    /// Returns the original error under [`ParsePolicy::FailFast`]
    pub fn handle(self, err: TrafficError, skipped: &mut Vec<SkippedRow>) -> Result<()> {
        match (self, err) {
            (
                Self::SkipAndReport,
                TrafficError::Parse {
                    row,
                    column,
                    value,
                    reason,
                },
            ) => {
                tracing::warn!(row, column = %column, value = %value, "skipping malformed row: {reason}");
                skipped.push(SkippedRow {
                    row,
                    column,
                    reason,
                });
                Ok(())
            }
            (_, err) => Err(err),
        }
    }
}

// ============================================================================
// Table Types
// ============================================================================

/// Header columns every input file must carry
pub const EXPECTED_COLUMNS: [&str; 9] = [
    "holiday",
    "temp",
    "rain_1h",
    "snow_1h",
    "clouds_all",
    "weather_main",
    "weather_description",
    "date_time",
    "traffic_volume",
];

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    /// Undecoded records; fields are checked as UTF-8 when typed
    pub rows: Vec<csv::ByteRecord>,
}

impl CsvData {
    /// Get number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// One hourly observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// Zero-based data-row index in the input file
    pub source_row: usize,
    pub holiday: String,
    /// Kelvin
    pub temp: f64,
    pub rain_1h: f64,
    pub snow_1h: f64,
    pub clouds_all: u8,
    pub weather_main: String,
    pub weather_description: String,
    pub date_time: String,
    /// Cars counted in the preceding hour
    pub traffic_volume: u32,
}

/// The loaded dataset, held immutably for the session
#[derive(Debug, Clone, Default)]
pub struct TrafficTable {
    pub rows: Vec<Row>,
}

impl TrafficTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Calendar sub-fields derived from a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CalendarFields {
    /// 0..=23
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday
    pub dayofweek: u32,
    /// 1..=12
    pub month: u32,
    pub year: i32,
}

/// A row annotated with its parsed timestamp and calendar fields
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    /// Zero-based data-row index in the input file
    pub source_index: usize,
    pub timestamp: NaiveDateTime,
    pub calendar: CalendarFields,
    pub row: Row,
}

/// A table (or sub-table) of derived rows, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedTable {
    pub rows: Vec<DerivedRow>,
}

impl DerivedTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of a numeric column in row order
    #[must_use]
    pub fn values(&self, column: NumericColumn) -> Vec<f64> {
        self.rows.iter().map(|r| column.value(r)).collect()
    }
}

// ============================================================================
// Partition Types
// ============================================================================

/// Named ways of splitting a table into disjoint subsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionScheme {
    /// `day` = hour in [7, 19), `night` = the rest
    DayNight,
    /// `business_day` = Monday..Friday, `weekend` = Saturday and Sunday
    Weekday,
}

impl PartitionScheme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DayNight => "day_night",
            Self::Weekday => "weekday_weekend",
        }
    }

    /// Partition names produced by this scheme
    #[must_use]
    pub fn names(self) -> [&'static str; 2] {
        match self {
            Self::DayNight => ["day", "night"],
            Self::Weekday => ["business_day", "weekend"],
        }
    }
}

impl FromStr for PartitionScheme {
    type Err = TrafficError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "day_night" | "daynight" => Ok(Self::DayNight),
            "weekday_weekend" | "weekday" => Ok(Self::Weekday),
            other => Err(TrafficError::Config(format!(
                "unknown partition scheme '{other}' (expected day_night or weekday_weekend)"
            ))),
        }
    }
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of partitioning: partition name to sub-table
#[derive(Debug, Clone)]
pub struct Partitions {
    pub scheme: PartitionScheme,
    pub parts: BTreeMap<&'static str, DerivedTable>,
}

impl Partitions {
    /// Look up a partition by name
    ///
    /// # Errors
    /// Returns a configuration error if the scheme has no such partition
    #[allow(dead_code)]
    pub fn get(&self, name: &str) -> Result<&DerivedTable> {
        self.parts.get(name).ok_or_else(|| {
            TrafficError::Config(format!(
                "partition scheme {} has no partition '{name}' (expected {})",
                self.scheme,
                self.scheme.names().join(" or ")
            ))
        })
    }

    /// Take ownership of a partition by name
    ///
    /// # Errors
    /// Returns a configuration error if the scheme has no such partition
    pub fn take(&mut self, name: &str) -> Result<DerivedTable> {
        let scheme = self.scheme;
        self.parts.remove(name).ok_or_else(|| {
            TrafficError::Config(format!(
                "partition scheme {scheme} has no partition '{name}' (expected {})",
                scheme.names().join(" or ")
            ))
        })
    }
}

// ============================================================================
// Aggregation Types
// ============================================================================

/// Numeric columns, raw and derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NumericColumn {
    #[serde(rename = "temp")]
    Temp,
    #[serde(rename = "rain_1h")]
    Rain1h,
    #[serde(rename = "snow_1h")]
    Snow1h,
    #[serde(rename = "clouds_all")]
    CloudsAll,
    #[serde(rename = "traffic_volume")]
    TrafficVolume,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "dayofweek")]
    DayOfWeek,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "hour")]
    Hour,
}

impl NumericColumn {
    pub const ALL: [Self; 9] = [
        Self::Temp,
        Self::Rain1h,
        Self::Snow1h,
        Self::CloudsAll,
        Self::TrafficVolume,
        Self::Month,
        Self::DayOfWeek,
        Self::Year,
        Self::Hour,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Temp => "temp",
            Self::Rain1h => "rain_1h",
            Self::Snow1h => "snow_1h",
            Self::CloudsAll => "clouds_all",
            Self::TrafficVolume => "traffic_volume",
            Self::Month => "month",
            Self::DayOfWeek => "dayofweek",
            Self::Year => "year",
            Self::Hour => "hour",
        }
    }

    /// Read this column from a derived row
    #[must_use]
    pub fn value(self, r: &DerivedRow) -> f64 {
        match self {
            Self::Temp => r.row.temp,
            Self::Rain1h => r.row.rain_1h,
            Self::Snow1h => r.row.snow_1h,
            Self::CloudsAll => f64::from(r.row.clouds_all),
            Self::TrafficVolume => f64::from(r.row.traffic_volume),
            Self::Month => f64::from(r.calendar.month),
            Self::DayOfWeek => f64::from(r.calendar.dayofweek),
            Self::Year => f64::from(r.calendar.year),
            Self::Hour => f64::from(r.calendar.hour),
        }
    }
}

impl FromStr for NumericColumn {
    type Err = TrafficError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| TrafficError::Config(format!("unknown numeric column '{s}'")))
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Columns a table can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Hour,
    #[serde(rename = "dayofweek")]
    DayOfWeek,
    Month,
    Year,
    Holiday,
    CloudsAll,
    WeatherMain,
    WeatherDescription,
}

impl GroupKey {
    pub const ALL: [Self; 8] = [
        Self::Hour,
        Self::DayOfWeek,
        Self::Month,
        Self::Year,
        Self::Holiday,
        Self::CloudsAll,
        Self::WeatherMain,
        Self::WeatherDescription,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::DayOfWeek => "dayofweek",
            Self::Month => "month",
            Self::Year => "year",
            Self::Holiday => "holiday",
            Self::CloudsAll => "clouds_all",
            Self::WeatherMain => "weather_main",
            Self::WeatherDescription => "weather_description",
        }
    }

    /// Group value of a derived row
    #[must_use]
    pub fn value(self, r: &DerivedRow) -> KeyValue {
        match self {
            Self::Hour => KeyValue::Int(i64::from(r.calendar.hour)),
            Self::DayOfWeek => KeyValue::Int(i64::from(r.calendar.dayofweek)),
            Self::Month => KeyValue::Int(i64::from(r.calendar.month)),
            Self::Year => KeyValue::Int(i64::from(r.calendar.year)),
            Self::CloudsAll => KeyValue::Int(i64::from(r.row.clouds_all)),
            Self::Holiday => KeyValue::Text(r.row.holiday.clone()),
            Self::WeatherMain => KeyValue::Text(r.row.weather_main.clone()),
            Self::WeatherDescription => KeyValue::Text(r.row.weather_description.clone()),
        }
    }
}

impl FromStr for GroupKey {
    type Err = TrafficError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| TrafficError::Config(format!("unknown group key '{s}'")))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A distinct value of a group key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Running sum and count for one group; finalized to a mean on read
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupMean {
    pub sum: f64,
    pub count: usize,
}

/// Mapping from group key value to the mean of a target column
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAggregate {
    pub key: GroupKey,
    pub target: NumericColumn,
    pub groups: BTreeMap<KeyValue, GroupMean>,
}

/// One point of an aggregate series, ready for charting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: KeyValue,
    pub mean: f64,
    pub count: usize,
}

// ============================================================================
// Statistics Types
// ============================================================================

/// A Pearson coefficient, or the explicit absence of one
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Defined(f64),
    /// Zero variance or fewer than two usable pairs
    Undefined,
}

impl Correlation {
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(r) => Some(r),
            Self::Undefined => None,
        }
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl Serialize for Correlation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Defined(r) => serializer.serialize_f64(*r),
            Self::Undefined => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(r) => write!(f, "{r:.4}"),
            Self::Undefined => f.write_str("undefined"),
        }
    }
}

/// Coefficients of every other numeric column against a target
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationVector {
    pub target: NumericColumn,
    pub coefficients: Vec<(NumericColumn, Correlation)>,
}

impl CorrelationVector {
    #[allow(dead_code)]
    #[must_use]
    pub fn get(&self, column: NumericColumn) -> Option<Correlation> {
        self.coefficients
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, r)| *r)
    }

    /// Defined coefficient with the largest magnitude
    #[must_use]
    pub fn strongest(&self) -> Option<(NumericColumn, f64)> {
        self.coefficients
            .iter()
            .filter_map(|(c, r)| r.value().map(|v| (*c, v)))
            .max_by(|a, b| {
                a.1.abs()
                    .partial_cmp(&b.1.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

/// Descriptive statistics for a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); NaN for a single value
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Format as a summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: n={}, mean={:.2}, std={:.2}, min={:.2}, Q1={:.2}, median={:.2}, Q3={:.2}, max={:.2}",
            self.name, self.count, self.mean, self.std_dev, self.min, self.q1, self.median, self.q3, self.max
        )
    }
}

/// Equal-width histogram; `edges` has one more entry than `counts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Distribution of the target column over one row set
#[derive(Debug, Clone, Serialize)]
pub struct VolumeProfile {
    pub rows: usize,
    pub stats: Option<ColumnStats>,
    pub histogram: Option<Histogram>,
}

/// Everything the analysis produces for the reporter
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub row_count: usize,
    pub skipped: Vec<SkippedRow>,
    pub overall: VolumeProfile,
    pub day: VolumeProfile,
    pub night: VolumeProfile,
    pub by_month: GroupAggregate,
    pub by_dayofweek: GroupAggregate,
    pub july_by_year: GroupAggregate,
    pub by_hour_business: GroupAggregate,
    pub by_hour_weekend: GroupAggregate,
    pub by_weather_main: GroupAggregate,
    pub by_weather_description: GroupAggregate,
    pub correlation: CorrelationVector,
}
