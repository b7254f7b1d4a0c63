//! Analysis pipeline that orchestrates derivation, partitioning, aggregation and correlation

use crate::structs::{
    AnalysisResult, ColumnStats, DerivedTable, GroupKey, Histogram, NumericColumn, ParsePolicy,
    Parsed, PartitionScheme, Result, TrafficTable, VolumeProfile,
};
use crate::traffic::aggregate::aggregate;
use crate::traffic::correlation::correlation_vector;
use crate::traffic::partition::{partition, select};
use crate::traffic::stats::DEFAULT_BINS;
use crate::traffic::time::derive;
use tracing::{info, warn};

/// Month whose per-year averages are broken out
pub const JULY: u32 = 7;

/// Configuration for the analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub target: NumericColumn,
    pub histogram_bins: usize,
    pub policy: ParsePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target: NumericColumn::TrafficVolume,
            histogram_bins: DEFAULT_BINS,
            policy: ParsePolicy::FailFast,
        }
    }
}

/// Describe and bin the target column. Empty row sets are non-fatal.
fn profile(label: &str, table: &DerivedTable, config: &AnalysisConfig) -> Result<VolumeProfile> {
    let values = table.values(config.target);
    if values.is_empty() {
        warn!(partition = label, "no rows, skipping distribution");
        return Ok(VolumeProfile {
            rows: 0,
            stats: None,
            histogram: None,
        });
    }

    Ok(VolumeProfile {
        rows: values.len(),
        stats: Some(ColumnStats::describe(config.target.name(), &values)?),
        histogram: Some(Histogram::build(
            config.target.name(),
            &values,
            config.histogram_bins,
        )?),
    })
}

/// Run the full analysis pipeline
///
/// # Errors
/// Returns error if a timestamp is malformed under [`ParsePolicy::FailFast`] or the
/// histogram configuration is invalid
#[tracing::instrument(skip_all, fields(rows = table.len(), target = %config.target))]
pub fn run_pipeline(table: &TrafficTable, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let derived = derive(table, config.policy)?;
    let all = derived.data;
    info!(rows = all.len(), skipped = derived.skipped.len(), "derived time fields");

    let overall = profile("all", &all, config)?;

    let mut day_night = partition(&all, PartitionScheme::DayNight);
    let day = day_night.take("day")?;
    let night = day_night.take("night")?;
    info!(day = day.len(), night = night.len(), "split day and night");

    let day_profile = profile("day", &day, config)?;
    let night_profile = profile("night", &night, config)?;

    // Heavy traffic indicators are looked for in daytime rows only
    let target = config.target;
    let by_month = aggregate(&day, GroupKey::Month, target);
    let by_dayofweek = aggregate(&day, GroupKey::DayOfWeek, target);

    let only_july = select(&day, |r| r.calendar.month == JULY);
    let july_by_year = aggregate(&only_july, GroupKey::Year, target);

    let mut week = partition(&day, PartitionScheme::Weekday);
    let business_days = week.take("business_day")?;
    let weekend = week.take("weekend")?;
    let by_hour_business = aggregate(&business_days, GroupKey::Hour, target);
    let by_hour_weekend = aggregate(&weekend, GroupKey::Hour, target);

    let correlation = correlation_vector(&day, target)?;
    if let Some((column, r)) = correlation.strongest() {
        info!(column = %column, r, "strongest daytime correlation");
    }

    let by_weather_main = aggregate(&day, GroupKey::WeatherMain, target);
    let by_weather_description = aggregate(&day, GroupKey::WeatherDescription, target);

    Ok(AnalysisResult {
        row_count: all.len(),
        skipped: derived.skipped,
        overall,
        day: day_profile,
        night: night_profile,
        by_month,
        by_dayofweek,
        july_by_year,
        by_hour_business,
        by_hour_weekend,
        by_weather_main,
        by_weather_description,
        correlation,
    })
}

/// Run the pipeline on a loaded table, reporting loader and derivation skips together
///
/// Every skipped row carries its data-row index in the input file, in file order.
///
/// # Errors
/// Same as [`run_pipeline`]
pub fn analyze_loaded(
    loaded: Parsed<TrafficTable>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    let mut result = run_pipeline(&loaded.data, config)?;
    let mut skipped = loaded.skipped;
    skipped.append(&mut result.skipped);
    skipped.sort_by_key(|s| s.row);
    result.skipped = skipped;
    Ok(result)
}
