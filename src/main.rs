use anyhow::{Context, Result};
use chart_warehouse::cli_style::{
    get_styles, print_error, print_key_value, print_section_footer, print_section_header,
    print_success, print_warning,
};
use chart_warehouse::config::{parse_date, AppConfig, CliConfig, FileConfig};
use chart_warehouse::etl::{self, DEFAULT_ARTIST_DELIMITER, DEFAULT_MAX_RANK, DEFAULT_WINDOW_DAYS};
use chart_warehouse::{PipelineReport, SqliteWarehouseStore};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Loads a directory of daily chart CSV files into the warehouse.
#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = env!("BUILD_VERSION"))]
struct CliArgs {
    /// Directory holding one CSV file per chart day.
    #[clap(value_parser = parse_path)]
    pub input_dir: Option<PathBuf>,

    /// Path to the SQLite warehouse database file, created if missing.
    #[clap(value_parser = parse_path)]
    pub warehouse_db: Option<PathBuf>,

    /// TOML config file; its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// First day of the date dimension (YYYY-MM-DD). Defaults to the earliest input day.
    #[clap(long, value_parser = parse_date)]
    pub window_start: Option<NaiveDate>,

    /// Number of days in the date dimension.
    #[clap(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    pub window_days: u32,

    /// Rows ranked above this are dropped.
    #[clap(long, default_value_t = DEFAULT_MAX_RANK)]
    pub max_rank: u32,

    /// Separator between collaborating artists.
    #[clap(long, default_value_t = DEFAULT_ARTIST_DELIMITER)]
    pub artist_delimiter: char,

    /// Replace the warehouse contents instead of appending to them.
    #[clap(long)]
    pub clear_target: bool,

    /// Run every stage but do not write to the warehouse.
    #[clap(long)]
    pub dry_run: bool,

    /// Print the batch report as JSON.
    #[clap(long)]
    pub json: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            input_dir: self.input_dir.clone(),
            warehouse_db: self.warehouse_db.clone(),
            window_start: self.window_start,
            window_days: self.window_days,
            max_rank: self.max_rank,
            artist_delimiter: self.artist_delimiter,
            clear_target: self.clear_target,
            dry_run: self.dry_run,
        }
    }
}

fn print_report(report: &PipelineReport) {
    print_section_header("Chart Batch");
    print_key_value(
        "Window",
        &format!("{} to {}", report.window_start, report.window_end),
    );
    print_key_value("Day files", &report.day_files.to_string());
    print_key_value("Rows kept", &report.rows_loaded.to_string());
    print_key_value("Rows dropped", &report.rows_dropped.to_string());
    print_key_value("Dates", &report.counts.dates.to_string());
    print_key_value("Artists", &report.counts.artists.to_string());
    print_key_value("Tracks", &report.counts.tracks.to_string());
    print_key_value("Facts", &report.counts.facts.to_string());
    print_section_footer();

    if report.skipped_files > 0 {
        print_warning(&format!(
            "{} file(s) skipped, no chart date in their name",
            report.skipped_files
        ));
    }
    if report.duplicate_grain_rows > 0 {
        print_warning(&format!(
            "{} duplicate chart row(s) ignored",
            report.duplicate_grain_rows
        ));
    }
    if report.renamed_track_rows > 0 {
        print_warning(&format!(
            "{} row(s) used a different name for an already known track",
            report.renamed_track_rows
        ));
    }

    if report.loaded {
        print_success("Batch loaded");
    } else {
        print_success("Dry run complete, warehouse untouched");
    }
}

fn main() -> Result<ExitCode> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening warehouse at {:?}...", config.warehouse_db);
    let mut store = SqliteWarehouseStore::new(&config.warehouse_db)?;

    match etl::run(&config.pipeline_options(), &mut store) {
        Ok(report) => {
            if cli_args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!("Batch aborted during {}: {}", err.stage(), err);
            print_error(&format!("Batch failed during {}: {}", err.stage(), err));
            Ok(ExitCode::FAILURE)
        }
    }
}
