//! Reading daily chart snapshots.
//!
//! Each input file holds one chart day, and the day itself is only encoded
//! in the file name (e.g. `regional-global-daily-2025-12-24.csv`). Rows that
//! fail type coercion are dropped and counted; the batch carries on.

use super::error::{EtlError, EtlResult};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

lazy_static! {
    static ref CHART_DATE_PATTERN: Regex =
        Regex::new(r"([0-9]{4})-([0-9]{2})-([0-9]{2})").expect("valid chart date pattern");
}

pub const DEFAULT_MAX_RANK: u32 = 200;

/// One chart row, typed and tied to its chart date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartObservation {
    pub date: NaiveDate,
    pub uri: String,
    pub track_name: String,
    /// Unsplit collaboration string, e.g. `"Artist A, Artist B"`.
    pub artist_names: String,
    pub rank: u32,
    pub streams: u64,
    pub source: String,
    /// 1-based line in the source file, header included.
    pub line: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    pub max_rank: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_rank: DEFAULT_MAX_RANK,
        }
    }
}

/// Columns of a chart CSV. Everything is read as text so that coercion
/// failures are counted per row instead of aborting the reader.
#[derive(Debug, Deserialize)]
struct RawChartRow {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default, alias = "artist_name")]
    artist_names: Option<String>,
    #[serde(default)]
    rank: Option<String>,
    #[serde(default)]
    streams: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DayLoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_dropped: usize,
}

#[derive(Clone, Debug)]
pub struct DayLoad {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub observations: Vec<ChartObservation>,
    pub report: DayLoadReport,
}

/// All day files of an input directory, ordered by chart date.
#[derive(Clone, Debug, Default)]
pub struct InputLoad {
    pub days: Vec<DayLoad>,
    /// `.csv` files whose name carries no chart date.
    pub skipped_files: Vec<PathBuf>,
}

impl InputLoad {
    pub fn rows_dropped(&self) -> usize {
        self.days.iter().map(|d| d.report.rows_dropped).sum()
    }

    pub fn rows_loaded(&self) -> usize {
        self.days.iter().map(|d| d.report.rows_loaded).sum()
    }

    pub fn observations(&self) -> impl Iterator<Item = &ChartObservation> {
        self.days.iter().flat_map(|d| d.observations.iter())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }
}

/// Extracts the chart date from the file stem. The last `YYYY-MM-DD` wins.
pub fn parse_chart_date(path: &Path) -> EtlResult<NaiveDate> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EtlError::MalformedInput {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;

    let captures = CHART_DATE_PATTERN
        .captures_iter(stem)
        .last()
        .ok_or_else(|| EtlError::MalformedInput {
            path: path.to_path_buf(),
            reason: format!("no YYYY-MM-DD date in file name '{}'", stem),
        })?;

    let not_a_date = || EtlError::MalformedInput {
        path: path.to_path_buf(),
        reason: format!("'{}' is not a calendar date", &captures[0]),
    };
    let year: i32 = captures[1].parse().map_err(|_| not_a_date())?;
    let month: u32 = captures[2].parse().map_err(|_| not_a_date())?;
    let day: u32 = captures[3].parse().map_err(|_| not_a_date())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(not_a_date)
}

/// Accepts plain integers and integral floats ("1000000.0"), rejects negatives.
fn coerce_non_negative(value: Option<&str>) -> Option<u64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = value.parse::<u64>() {
        return Some(parsed);
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 && parsed.fract() == 0.0 => {
            Some(parsed as u64)
        }
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_row(
    row: RawChartRow,
    date: NaiveDate,
    line: u64,
    options: &LoadOptions,
) -> Result<ChartObservation, String> {
    let uri = non_blank(row.uri).ok_or("missing uri")?;
    let track_name = non_blank(row.track_name).ok_or("missing track_name")?;
    let artist_names = row.artist_names.unwrap_or_default();

    let rank = coerce_non_negative(row.rank.as_deref())
        .ok_or_else(|| format!("rank {:?} is not a non-negative integer", row.rank))?;
    if rank < 1 || rank > options.max_rank as u64 {
        return Err(format!("rank {} outside 1..={}", rank, options.max_rank));
    }
    let streams = coerce_non_negative(row.streams.as_deref())
        .ok_or_else(|| format!("streams {:?} is not a non-negative integer", row.streams))?;
    // Stored as a signed SQLite INTEGER
    if i64::try_from(streams).is_err() {
        return Err(format!("streams {} exceeds {}", streams, i64::MAX));
    }

    Ok(ChartObservation {
        date,
        uri,
        track_name,
        artist_names,
        rank: rank as u32,
        streams,
        source: row.source.map(|s| s.trim().to_string()).unwrap_or_default(),
        line,
    })
}

/// Reads one day file. The artist field is kept unsplit.
pub fn load_day_file(path: &Path, options: &LoadOptions) -> EtlResult<DayLoad> {
    let date = parse_chart_date(path)?;

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut report = DayLoadReport::default();
    let mut observations = Vec::new();

    for result in reader.deserialize::<RawChartRow>() {
        report.rows_read += 1;
        // Header is line 1
        let line = report.rows_read as u64 + 1;

        let cleaned = result
            .map_err(|e| e.to_string())
            .and_then(|row| clean_row(row, date, line, options));
        match cleaned {
            Ok(observation) => observations.push(observation),
            Err(reason) => {
                report.rows_dropped += 1;
                debug!("Dropping {}:{}: {}", path.display(), line, reason);
            }
        }
    }
    report.rows_loaded = observations.len();

    if report.rows_dropped > 0 {
        warn!(
            "Dropped {} of {} rows in {}",
            report.rows_dropped,
            report.rows_read,
            path.display()
        );
    }

    Ok(DayLoad {
        path: path.to_path_buf(),
        date,
        observations,
        report,
    })
}

fn list_csv_files(dir: &Path) -> EtlResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every day file of `dir`. Files are parsed in parallel and then
/// merged in chart-date order, so the result does not depend on scheduling.
pub fn load_input_dir(dir: &Path, options: &LoadOptions) -> EtlResult<InputLoad> {
    let mut dated_files: Vec<(NaiveDate, PathBuf)> = Vec::new();
    let mut skipped_files = Vec::new();

    for path in list_csv_files(dir)? {
        match parse_chart_date(&path) {
            Ok(date) => dated_files.push((date, path)),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                skipped_files.push(path);
            }
        }
    }

    let mut seen_dates: HashMap<NaiveDate, &Path> = HashMap::new();
    for (date, path) in &dated_files {
        if let Some(previous) = seen_dates.insert(*date, path.as_path()) {
            return Err(EtlError::MalformedInput {
                path: path.clone(),
                reason: format!(
                    "chart date {} already provided by {}",
                    date,
                    previous.display()
                ),
            });
        }
    }

    info!(
        "Loading {} day files from {}",
        dated_files.len(),
        dir.display()
    );

    let mut days = dated_files
        .par_iter()
        .map(|(_, path)| load_day_file(path, options))
        .collect::<EtlResult<Vec<DayLoad>>>()?;
    days.sort_by_key(|d| d.date);

    Ok(InputLoad {
        days,
        skipped_files,
    })
}
