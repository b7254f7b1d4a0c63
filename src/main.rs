#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

mod csv_reader;
mod structs;
mod traffic;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use structs::{GroupKey, NumericColumn, ParsePolicy, Result, TrafficError, TrafficTable};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use traffic::aggregate::aggregate_columns;
use traffic::output::SeriesOutput;
use traffic::partition::{partition_by_name, select};
use traffic::pipeline::{analyze_loaded, AnalysisConfig};

/// i94 - heavy traffic indicators for hourly traffic-volume data
#[derive(Parser, Debug)]
#[command(name = "i94")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full analysis and write report files
    Analyze {
        /// Input CSV/TSV file to analyze
        #[arg(short, long)]
        csv: PathBuf,

        /// Output directory for report files
        #[arg(short, long, default_value = "./i94_output")]
        output_dir: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// Skip malformed rows and report them instead of aborting
        #[arg(long)]
        skip_malformed: bool,

        /// Number of histogram bins
        #[arg(long, default_value = "10")]
        bins: usize,
    },

    /// Average a column per group and print the series as JSON
    Group {
        /// Input CSV/TSV file to analyze
        #[arg(short, long)]
        csv: PathBuf,

        /// Column to group by (hour, dayofweek, month, year, holiday, clouds_all,
        /// weather_main, weather_description)
        #[arg(short, long)]
        by: String,

        /// Numeric column(s) to average, comma separated
        #[arg(short, long, default_value = "traffic_volume")]
        target: String,

        /// Partition scheme to restrict rows with (day_night, weekday_weekend)
        #[arg(long, requires = "part")]
        scheme: Option<String>,

        /// Partition of the scheme to keep (day, night, business_day, weekend)
        #[arg(long, requires = "scheme")]
        part: Option<String>,

        /// Keep only rows from this month (1-12)
        #[arg(long)]
        month: Option<u32>,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// Skip malformed rows and report them instead of aborting
        #[arg(long)]
        skip_malformed: bool,
    },
}

const fn policy(skip_malformed: bool) -> ParsePolicy {
    if skip_malformed {
        ParsePolicy::SkipAndReport
    } else {
        ParsePolicy::FailFast
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Analyze {
            csv,
            output_dir,
            tsv,
            skip_malformed,
            bins,
        }) => run_analyze(
            &csv,
            &output_dir,
            &AnalysisConfig {
                target: NumericColumn::TrafficVolume,
                histogram_bins: bins,
                policy: policy(skip_malformed),
            },
            tsv,
        ),

        Some(Commands::Group {
            csv,
            by,
            target,
            scheme,
            part,
            month,
            tsv,
            skip_malformed,
        }) => run_group(
            &csv,
            &GroupRequest {
                by: &by,
                target: &target,
                scheme: scheme.as_deref().zip(part.as_deref()),
                month,
            },
            tsv,
            policy(skip_malformed),
        ),

        None => {
            eprintln!("No subcommand provided. Use 'i94 analyze' or 'i94 group'.");
            eprintln!("Run 'i94 --help' for usage information.");
            std::process::exit(1);
        }
    }
}

/// Run the full analysis and write report files
fn run_analyze(
    csv_path: &Path,
    output_dir: &Path,
    config: &AnalysisConfig,
    tsv: bool,
) -> Result<()> {
    let loaded = TrafficTable::load(csv_path, tsv, config.policy)?;

    std::fs::create_dir_all(output_dir)?;

    let result = analyze_loaded(loaded, config)?;

    info!(dir = %output_dir.display(), "writing report files");
    let summary = traffic::output::build_summary(csv_path, &result);
    traffic::output::write_summary(output_dir, &summary)?;
    traffic::output::write_report_json(output_dir, &result)?;
    traffic::output::write_correlation(output_dir, &result.correlation)?;

    info!("  - summary.txt");
    info!("  - report.json");
    info!("  - correlation.csv");

    Ok(())
}

/// Options of the group command, still as user-supplied names
struct GroupRequest<'a> {
    by: &'a str,
    target: &'a str,
    scheme: Option<(&'a str, &'a str)>,
    month: Option<u32>,
}

/// Aggregate one or more columns per group and print the series
fn run_group(
    csv_path: &Path,
    request: &GroupRequest<'_>,
    tsv: bool,
    policy: ParsePolicy,
) -> Result<()> {
    // Resolve column names before touching the file
    let key: GroupKey = request.by.parse()?;
    let targets = request
        .target
        .split(',')
        .map(|name| name.trim().parse::<NumericColumn>())
        .collect::<Result<Vec<_>>>()?;
    if let Some(month) = request.month {
        if !(1..=12).contains(&month) {
            return Err(TrafficError::Config(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
    }

    let loaded = TrafficTable::load(csv_path, tsv, policy)?;
    let derived = traffic::time::derive(&loaded.data, policy)?;
    let mut rows = derived.data;

    if let Some((scheme, part)) = request.scheme {
        let mut parts = partition_by_name(&rows, scheme)?;
        rows = parts.take(part)?;
    }
    if let Some(month) = request.month {
        rows = select(&rows, |r| r.calendar.month == month);
    }

    let aggregates = aggregate_columns(&rows, key, &targets);
    info!(rows = rows.len(), key = %key, targets = aggregates.len(), "aggregated");

    let series: Vec<SeriesOutput> = aggregates
        .iter()
        .map(|agg| SeriesOutput::new(&format!("{}_by_{key}", agg.target), agg))
        .collect();
    println!("{}", serde_json::to_string_pretty(&series)?);

    Ok(())
}
