use anyhow::{bail, Context, Result};
use chart_warehouse::cli_style::{
    get_styles, print_empty_list, print_error, print_info, print_key_value, print_section_footer,
    print_section_header, print_success, TableBuilder,
};
use chart_warehouse::config::parse_date;
use chart_warehouse::warehouse::{DateRange, SqliteWarehouseStore};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Runs analytical queries against a loaded chart warehouse.
#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = env!("BUILD_VERSION"))]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(value_parser = parse_path)]
    pub warehouse_db: PathBuf,

    /// Print results as JSON instead of a table.
    #[clap(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct RangeArgs {
    /// First chart date to include (YYYY-MM-DD).
    #[clap(long, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Last chart date to include (YYYY-MM-DD).
    #[clap(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn range(&self) -> Result<DateRange> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                bail!("--from {} is after --to {}", from, to);
            }
        }
        Ok(DateRange::new(self.from, self.to))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Row counts of every warehouse table.
    Counts,

    /// Share of streams per artist, collaborations split evenly.
    MarketShare {
        #[command(flatten)]
        range: RangeArgs,

        /// Only show the first N artists.
        #[clap(long)]
        top: Option<usize>,
    },

    /// Day-over-day rank change per track.
    RankMovement {
        #[command(flatten)]
        range: RangeArgs,

        /// Maximum number of rows to return.
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Fact rows whose dimension rows are missing. Exits non-zero if any.
    Orphans,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_rank_change(change: Option<i64>) -> String {
    match change {
        None => "new".to_string(),
        Some(0) => "=".to_string(),
        Some(c) if c > 0 => format!("+{}", c),
        Some(c) => c.to_string(),
    }
}

fn run(cli_args: &CliArgs, store: &SqliteWarehouseStore) -> Result<ExitCode> {
    match &cli_args.command {
        Command::Counts => {
            let counts = store.get_counts()?;
            if cli_args.json {
                return print_json(&counts).map(|_| ExitCode::SUCCESS);
            }
            print_section_header("Warehouse");
            print_key_value("dim_date", &counts.dates.to_string());
            print_key_value("dim_artists", &counts.artists.to_string());
            print_key_value("dim_tracks", &counts.tracks.to_string());
            print_key_value("fact_chart_rankings", &counts.facts.to_string());
            print_section_footer();
        }
        Command::MarketShare { range, top } => {
            let mut shares = store.market_share(&range.range()?)?;
            if let Some(top) = top {
                shares.truncate(*top);
            }
            if cli_args.json {
                return print_json(&shares).map(|_| ExitCode::SUCCESS);
            }
            if shares.is_empty() {
                print_empty_list("No chart data in range");
                return Ok(ExitCode::SUCCESS);
            }
            let mut table =
                TableBuilder::new(vec!["#", "Artist", "Streams", "Share %"]).align_right(&[0, 2, 3]);
            for (i, share) in shares.iter().enumerate() {
                table.add_row(vec![
                    (i + 1).to_string(),
                    share.artist_name.clone(),
                    format!("{:.0}", share.attributed_streams),
                    format!("{:.2}", share.share_pct),
                ]);
            }
            table.print();
        }
        Command::RankMovement { range, limit } => {
            let moves = store.rank_movement(&range.range()?, *limit)?;
            if cli_args.json {
                return print_json(&moves).map(|_| ExitCode::SUCCESS);
            }
            if moves.is_empty() {
                print_empty_list("No chart data in range");
                return Ok(ExitCode::SUCCESS);
            }
            let mut table = TableBuilder::new(vec!["Date", "Rank", "Prev", "Change", "Track"])
                .align_right(&[1, 2, 3]);
            for movement in &moves {
                table.add_row(vec![
                    movement.chart_date.clone(),
                    movement.rank.to_string(),
                    movement
                        .previous_rank
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format_rank_change(movement.rank_change),
                    movement.track_name.clone(),
                ]);
            }
            table.print();
        }
        Command::Orphans => {
            let orphans = store.find_orphan_facts()?;
            if cli_args.json {
                print_json(&orphans)?;
            } else if orphans.is_empty() {
                print_success("No orphaned fact rows");
            } else {
                print_error(&format!("{} orphaned fact row(s)", orphans.len()));
                let mut table =
                    TableBuilder::new(vec!["ranking_sk", "track_sk", "artist_sk", "date_key"])
                        .align_right(&[0, 1, 2, 3]);
                for orphan in &orphans {
                    table.add_row(vec![
                        orphan.ranking_sk.to_string(),
                        orphan.track_sk.to_string(),
                        orphan.artist_sk.to_string(),
                        orphan.date_key.to_string(),
                    ]);
                }
                table.print();
            }
            if !orphans.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    if !cli_args.warehouse_db.exists() {
        bail!("Warehouse database not found: {:?}", cli_args.warehouse_db);
    }
    let store = SqliteWarehouseStore::new(&cli_args.warehouse_db)
        .with_context(|| format!("Failed to open warehouse {:?}", cli_args.warehouse_db))?;

    if !cli_args.json && store.get_counts()?.is_empty() {
        print_info("Warehouse is empty, run chart-etl first");
    }

    run(&cli_args, &store)
}
