//! CLI entry point for the taxi trip pipeline.
//!
//! Provides subcommands for processing a raw trip file into a cleaned,
//! enriched and zone-merged CSV, and for querying a processed file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use taxi_trip_pipeline::analytics::{
    BoroughCount, ZoneCount, busiest_zones, counts_by_borough, top_earning_trips,
};
use taxi_trip_pipeline::{
    loader::{load_trips, load_zone_lookup, open_trips},
    output::{append_record, print_json, write_trips},
    pipeline,
    reject::CsvRejectSink,
};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "taxi_trip_pipeline")]
#[command(about = "Clean, enrich and analyse NYC taxi trip records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, enrich and zone-merge a raw trip file
    Process {
        /// Path or URL of the raw trip CSV (optionally .gz)
        #[arg(short, long, value_name = "FILE_OR_URL")]
        trips: String,

        /// Taxi zone lookup CSV
        #[arg(short, long, value_name = "FILE")]
        zones: PathBuf,

        /// Where to write the processed trips (defaults to
        /// $PROCESSED_DATA_DIR/cleaned_trips.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for rejected-row logs (defaults to $PROCESSED_DATA_DIR)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// CSV file to append run statistics to
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Print the highest-earning trips from a processed file
    TopTrips {
        /// Processed trip CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Number of trips to return
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
    /// Print trip counts per pickup borough from a processed file
    Boroughs {
        /// Processed trip CSV
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print the busiest pickup zones from a processed file
    BusiestZones {
        /// Processed trip CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Number of zones to return
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/taxi_trip_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("taxi_trip_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            trips,
            zones,
            output,
            log_dir,
            history,
        } => {
            let data_dir = processed_data_dir();
            let output = output.unwrap_or_else(|| data_dir.join("cleaned_trips.csv"));
            let log_dir = log_dir.unwrap_or(data_dir);

            process(&trips, &zones, &output, &log_dir, history.as_deref()).await?;
        }
        Commands::TopTrips { input, n } => {
            let table = open_trips(&input)?;
            print_json(&top_earning_trips(table.rows(), n))?;
        }
        Commands::Boroughs { input } => {
            let table = open_trips(&input)?;
            print_json(&BoroughCount::from_counts(counts_by_borough(table.rows())))?;
        }
        Commands::BusiestZones { input, n } => {
            let table = open_trips(&input)?;
            let zones: Vec<ZoneCount> = busiest_zones(table.rows(), n)
                .into_iter()
                .map(ZoneCount::from)
                .collect();
            print_json(&zones)?;
        }
    }

    Ok(())
}

/// Output directory from `PROCESSED_DATA_DIR`, or `processed_data`.
fn processed_data_dir() -> PathBuf {
    std::env::var("PROCESSED_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("processed_data"))
}

/// Loads, runs the pipeline, and writes the processed table and run stats.
#[tracing::instrument(skip_all, fields(trips = %trips, output = %output.display()))]
async fn process(
    trips: &str,
    zones: &Path,
    output: &Path,
    log_dir: &Path,
    history: Option<&Path>,
) -> Result<()> {
    let table = load_trips(trips).await?;
    let lookup = load_zone_lookup(zones)?;

    let mut sink = CsvRejectSink::new(log_dir);
    let result = pipeline::run(&table, &lookup, &mut sink)?;
    write_trips(output, &result.trips)?;

    let stats = result.stats.with_source(trips);
    if let Some(history) = history {
        append_record(history, &stats)?;
        info!(path = %history.display(), "Run statistics appended");
    }

    info!(
        input = stats.input_rows,
        output = stats.output_rows,
        duplicates = stats.duplicates,
        missing_values = stats.missing_values,
        invalid_values = stats.invalid_values,
        invalid_duration = stats.invalid_duration,
        "Processing complete"
    );
    Ok(())
}
