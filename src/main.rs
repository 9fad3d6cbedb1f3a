//! CLI entry point for the player-count pipeline.
//!
//! Provides one subcommand per stage (align, profile, describe), `run` for
//! all three in sequence, and `correlate` for the curated feature table.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use player_hours::analyzers::correlation::{
    CLOUD_FLAG, DEFAULT_FLAG_COLUMNS, DEFAULT_VALUE_COLUMNS, correlation_matrix,
    false_flag_counts, load_table, log_false_flag_counts, log_pairs, value_flag_pairs,
};
use player_hours::analyzers::descriptives::describe_dir;
use player_hours::analyzers::heatmap::write_artifacts;
use player_hours::batch::{align_dir, profile_dir};
use player_hours::config::{ConfigOverrides, PipelineConfig};
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "player_hours")]
#[command(about = "Hourly alignment and daily profiles for player-count exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// JSON file with default settings; flags take precedence
    #[arg(long, env = "PH_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of raw exports
    #[arg(long, env = "PH_RAW_DIR")]
    raw_dir: Option<PathBuf>,

    /// Directory for hourly-aligned files
    #[arg(long, env = "PH_HOURLY_DIR")]
    hourly_dir: Option<PathBuf>,

    /// Directory for daily profiles
    #[arg(long, env = "PH_DAILY_DIR")]
    daily_dir: Option<PathBuf>,

    /// Directory for Descriptives.csv
    #[arg(long, env = "PH_SUMMARY_DIR")]
    summary_dir: Option<PathBuf>,

    /// Drop samples before this instant (e.g. "2024-03-01 00:00:00")
    #[arg(long, env = "PH_START_DATE")]
    start_date: Option<String>,

    /// Target zone for daily profiles: IANA name or offset like "+05:00"
    #[arg(long, env = "PH_TIMEZONE")]
    timezone: Option<String>,

    /// Off-grid minutes: "strict" rejects the file, "nearest" snaps
    #[arg(long, env = "PH_MINUTE_POLICY")]
    minute_policy: Option<String>,
}

impl PipelineArgs {
    fn resolve(self) -> Result<PipelineConfig> {
        let file = match &self.config {
            Some(path) => ConfigOverrides::load(path)?,
            None => ConfigOverrides::default(),
        };
        let flags = ConfigOverrides {
            raw_dir: self.raw_dir,
            hourly_dir: self.hourly_dir,
            daily_dir: self.daily_dir,
            summary_dir: self.summary_dir,
            start_date: self.start_date,
            timezone: self.timezone,
            minute_policy: self.minute_policy,
        };
        let cfg = PipelineConfig::resolve(flags.or(file))?;
        info!(?cfg, "Configuration resolved");
        Ok(cfg)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stage 1: align raw exports onto hourly buckets
    Align(PipelineArgs),
    /// Stage 2: fold hourly files into 24-hour profiles
    Profile(PipelineArgs),
    /// Stage 3: mean and SD per daily profile
    Describe(PipelineArgs),
    /// Run align, profile and describe in sequence
    Run(PipelineArgs),
    /// Pearson correlations over a curated per-item table
    Correlate {
        /// CSV with one row per item
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Directory for the matrix CSV, heatmap PNG and HTML page
        #[arg(short, long, default_value = "data/output/correlation")]
        out_dir: PathBuf,

        /// Numeric columns to correlate
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_VALUE_COLUMNS.map(String::from))]
        values: Vec<String>,

        /// Boolean flag columns to correlate
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_FLAG_COLUMNS.map(String::from))]
        flags: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/player_hours.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("player_hours.log"));

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
        Commands::Align(args) => {
            let cfg = args.resolve()?;
            align_dir(&cfg.raw_dir, &cfg.hourly_dir, &cfg.aligner())?;
        }
        Commands::Profile(args) => {
            let cfg = args.resolve()?;
            profile_dir(&cfg.hourly_dir, &cfg.daily_dir, &cfg.profiler())?;
        }
        Commands::Describe(args) => {
            let cfg = args.resolve()?;
            describe_dir(&cfg.daily_dir, &cfg.summary_dir)?;
        }
        Commands::Run(args) => {
            let cfg = args.resolve()?;
            let aligned = align_dir(&cfg.raw_dir, &cfg.hourly_dir, &cfg.aligner())?;
            let profiled = profile_dir(&cfg.hourly_dir, &cfg.daily_dir, &cfg.profiler())?;
            let (summary, rows) = describe_dir(&cfg.daily_dir, &cfg.summary_dir)?;
            info!(
                aligned = aligned.written.len(),
                profiled = profiled.written.len(),
                items = rows.len(),
                summary = ?summary,
                "Pipeline finished"
            );
        }
        Commands::Correlate {
            table,
            out_dir,
            values,
            flags,
        } => {
            let file = File::open(&table).with_context(|| format!("failed to open {table:?}"))?;
            let data = load_table(BufReader::new(file), &values, &flags)
                .with_context(|| format!("failed to load {table:?}"))?;
            info!(rows = data.row_count(), columns = data.names().len(), "Table loaded");

            if let Some(counts) = false_flag_counts(&data, CLOUD_FLAG) {
                log_false_flag_counts(CLOUD_FLAG, &counts);
            }
            log_pairs(&value_flag_pairs(&data, &values, &flags));
            write_artifacts(&out_dir, &correlation_matrix(&data))?;
        }
    }

    Ok(())
}
