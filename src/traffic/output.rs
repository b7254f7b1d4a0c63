//! Report writers for the analyze command

use crate::structs::{
    AnalysisResult, CorrelationVector, GroupAggregate, GroupKey, NumericColumn, Result,
    SeriesPoint, SkippedRow, VolumeProfile,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Build the human readable overview
#[must_use]
pub fn build_summary(csv_path: &Path, result: &AnalysisResult) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Heavy traffic indicators: {}", csv_path.display());
    let _ = writeln!(s, "Rows analyzed: {}", result.row_count);
    if !result.skipped.is_empty() {
        let _ = writeln!(s, "Rows skipped: {}", result.skipped.len());
    }

    s.push_str("\nDistribution\n");
    for (label, profile) in [
        ("all", &result.overall),
        ("day", &result.day),
        ("night", &result.night),
    ] {
        match &profile.stats {
            Some(stats) => {
                let _ = writeln!(s, "  {label:<6}{}", stats.summary());
            }
            None => {
                let _ = writeln!(s, "  {label:<6}no rows");
            }
        }
    }

    s.push_str("\nDaytime averages\n");
    for (label, agg) in [
        ("by month", &result.by_month),
        ("by day of week", &result.by_dayofweek),
        ("July by year", &result.july_by_year),
        ("by hour, business days", &result.by_hour_business),
        ("by hour, weekend", &result.by_hour_weekend),
        ("by weather", &result.by_weather_main),
        ("by weather description", &result.by_weather_description),
    ] {
        match agg.peak() {
            Some(peak) => {
                let _ = writeln!(
                    s,
                    "  {label}: {} groups, highest {}={} ({:.1})",
                    agg.len(),
                    agg.key,
                    peak.key,
                    peak.mean
                );
            }
            None => {
                let _ = writeln!(s, "  {label}: no rows");
            }
        }
    }

    let _ = writeln!(s, "\nDaytime correlation with {}", result.correlation.target);
    for (column, r) in &result.correlation.coefficients {
        let _ = writeln!(s, "  {column:<16}{r}");
    }

    s
}

/// Write `summary.txt`
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_summary(output_dir: &Path, content: &str) -> Result<()> {
    let path = output_dir.join("summary.txt");
    fs::write(path, content)?;
    Ok(())
}

/// Write `correlation.csv` - one coefficient per column
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_correlation(output_dir: &Path, corr: &CorrelationVector) -> Result<()> {
    let path = output_dir.join("correlation.csv");
    let mut content = format!("column,{}\n", corr.target);

    for (column, r) in &corr.coefficients {
        match r.value() {
            Some(v) => {
                let _ = writeln!(content, "{column},{v:.6}");
            }
            None => {
                let _ = writeln!(content, "{column},undefined");
            }
        }
    }

    fs::write(path, content)?;
    Ok(())
}

/// Write `report.json` - every chart-ready series and coefficient
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_report_json(output_dir: &Path, result: &AnalysisResult) -> Result<()> {
    let path = output_dir.join("report.json");
    let json = serde_json::to_string_pretty(&ReportOutput::from(result))?;
    fs::write(path, json)?;
    Ok(())
}

// JSON output structures

#[derive(Serialize)]
struct ReportOutput<'a> {
    row_count: usize,
    skipped: &'a [SkippedRow],
    distribution: Distribution<'a>,
    daytime: Vec<SeriesOutput>,
    correlation: CorrelationOutput<'a>,
}

#[derive(Serialize)]
struct Distribution<'a> {
    all: &'a VolumeProfile,
    day: &'a VolumeProfile,
    night: &'a VolumeProfile,
}

/// Aggregate series as consumed by a charting collaborator
#[derive(Serialize)]
pub struct SeriesOutput {
    pub name: String,
    pub key: GroupKey,
    pub target: NumericColumn,
    pub points: Vec<SeriesPoint>,
}

impl SeriesOutput {
    #[must_use]
    pub fn new(name: &str, agg: &GroupAggregate) -> Self {
        Self {
            name: name.to_string(),
            key: agg.key,
            target: agg.target,
            points: agg.series(),
        }
    }
}

#[derive(Serialize)]
struct CorrelationOutput<'a> {
    target: NumericColumn,
    coefficients: Vec<CoefficientEntry<'a>>,
}

#[derive(Serialize)]
struct CoefficientEntry<'a> {
    column: NumericColumn,
    coefficient: &'a crate::structs::Correlation,
}

impl<'a> From<&'a AnalysisResult> for ReportOutput<'a> {
    fn from(result: &'a AnalysisResult) -> Self {
        let daytime = [
            ("by_month", &result.by_month),
            ("by_dayofweek", &result.by_dayofweek),
            ("july_by_year", &result.july_by_year),
            ("by_hour_business", &result.by_hour_business),
            ("by_hour_weekend", &result.by_hour_weekend),
            ("by_weather_main", &result.by_weather_main),
            ("by_weather_description", &result.by_weather_description),
        ]
        .into_iter()
        .map(|(name, agg)| SeriesOutput::new(name, agg))
        .collect();

        Self {
            row_count: result.row_count,
            skipped: &result.skipped,
            distribution: Distribution {
                all: &result.overall,
                day: &result.day,
                night: &result.night,
            },
            daytime,
            correlation: CorrelationOutput {
                target: result.correlation.target,
                coefficients: result
                    .correlation
                    .coefficients
                    .iter()
                    .map(|(column, coefficient)| CoefficientEntry {
                        column: *column,
                        coefficient,
                    })
                    .collect(),
            },
        }
    }
}
