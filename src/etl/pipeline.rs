//! One batch run: load, transform, validate, then write.
//!
//! Nothing touches the warehouse until every in-memory stage has succeeded,
//! and the write itself is a single transaction.

use super::dimensions::{DateWindow, Dimensions, DEFAULT_ARTIST_DELIMITER, DEFAULT_WINDOW_DAYS};
use super::error::{EtlError, EtlResult};
use super::facts::{build_facts, FactBuildReport};
use super::integrity;
use super::raw_loader::{load_input_dir, ChartObservation, InputLoad, LoadOptions, DEFAULT_MAX_RANK};
use crate::warehouse::{LoadMode, SqliteWarehouseStore, WarehouseBatch, WarehouseCounts};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub input_dir: PathBuf,
    /// First day of the date dimension; the earliest input date when unset.
    pub window_start: Option<NaiveDate>,
    pub window_days: u32,
    pub max_rank: u32,
    pub artist_delimiter: char,
    /// Replace the warehouse contents instead of appending to them.
    pub clear_target: bool,
    /// Run every stage except the write.
    pub dry_run: bool,
}

impl PipelineOptions {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            window_start: None,
            window_days: DEFAULT_WINDOW_DAYS,
            max_rank: DEFAULT_MAX_RANK,
            artist_delimiter: DEFAULT_ARTIST_DELIMITER,
            clear_target: false,
            dry_run: false,
        }
    }

    fn load_mode(&self) -> LoadMode {
        if self.clear_target {
            LoadMode::Replace
        } else {
            LoadMode::Append
        }
    }
}

/// The validated rows of a batch, ready to be written.
#[derive(Clone, Debug)]
pub struct TransformOutput {
    pub batch: WarehouseBatch,
    pub window: DateWindow,
    pub fact_report: FactBuildReport,
    pub renamed_track_rows: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub day_files: usize,
    pub skipped_files: usize,
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    pub duplicate_grain_rows: usize,
    pub renamed_track_rows: usize,
    /// Rows of the batch; written only when `loaded` is set.
    pub counts: WarehouseCounts,
    pub loaded: bool,
}

/// Builds and validates the star-schema rows for `input`.
pub fn transform(input: &InputLoad, options: &PipelineOptions) -> EtlResult<TransformOutput> {
    let first_date = input.first_date().ok_or_else(|| EtlError::MalformedInput {
        path: options.input_dir.clone(),
        reason: "no dated chart files found".to_string(),
    })?;
    let window = DateWindow::new(
        options.window_start.unwrap_or(first_date),
        options.window_days,
    )?;

    let observations: Vec<&ChartObservation> = input.observations().collect();

    let dimensions = Dimensions::build(&observations, &window, options.artist_delimiter)?;
    let (facts, fact_report) = build_facts(&observations, &dimensions, options.artist_delimiter)?;
    integrity::validate(&dimensions, &facts)?;

    let renamed_track_rows = dimensions.renamed_track_rows;
    let batch = WarehouseBatch {
        dates: dimensions.dates,
        artists: dimensions.artists,
        tracks: dimensions.tracks,
        facts,
    };

    Ok(TransformOutput {
        batch,
        window,
        fact_report,
        renamed_track_rows,
    })
}

/// Runs a full batch against `store`.
pub fn run(options: &PipelineOptions, store: &mut SqliteWarehouseStore) -> EtlResult<PipelineReport> {
    let load_options = LoadOptions {
        max_rank: options.max_rank,
    };
    let input = load_input_dir(&options.input_dir, &load_options)?;
    info!(
        "Read {} day files: {} rows kept, {} dropped, {} files skipped",
        input.days.len(),
        input.rows_loaded(),
        input.rows_dropped(),
        input.skipped_files.len()
    );

    let output = transform(&input, options)?;
    let batch = &output.batch;
    let counts = WarehouseCounts {
        dates: batch.dates.len(),
        artists: batch.artists.len(),
        tracks: batch.tracks.len(),
        facts: batch.facts.len(),
    };

    let loaded = if options.dry_run {
        info!("Dry run, skipping warehouse write");
        false
    } else {
        store.load_batch(batch, options.load_mode())?;
        true
    };

    Ok(PipelineReport {
        window_start: output.window.start(),
        window_end: output.window.end(),
        day_files: input.days.len(),
        skipped_files: input.skipped_files.len(),
        rows_loaded: input.rows_loaded(),
        rows_dropped: input.rows_dropped(),
        duplicate_grain_rows: output.fact_report.duplicate_grain_rows,
        renamed_track_rows: output.renamed_track_rows,
        counts,
        loaded,
    })
}
