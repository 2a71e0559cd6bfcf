//! Temporary warehouse wired to an input directory

use super::constants::*;
use super::fixtures::create_sample_input;
use chart_warehouse::etl::{self, EtlResult, PipelineOptions, PipelineReport};
use chart_warehouse::warehouse::{date_key, FactChartRanking, SqliteWarehouseStore};
use chrono::NaiveDate;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestWarehouse {
    pub input_dir: TempDir,
    #[allow(dead_code)]
    db_dir: TempDir,
    pub db_path: PathBuf,
    pub store: SqliteWarehouseStore,
    pub options: PipelineOptions,
}

impl TestWarehouse {
    /// Empty warehouse reading from `input_dir`, window fixed at
    /// [`WINDOW_START`] for [`WINDOW_DAYS`] days.
    pub fn with_input(input_dir: TempDir) -> Self {
        let db_dir = TempDir::new().unwrap();
        let db_path = db_dir.path().join("warehouse.db");
        let store = SqliteWarehouseStore::new(&db_path).unwrap();

        let mut options = PipelineOptions::new(input_dir.path());
        options.window_start = Some(parse(WINDOW_START));
        options.window_days = WINDOW_DAYS;

        TestWarehouse {
            input_dir,
            db_dir,
            db_path,
            store,
            options,
        }
    }

    pub fn sample() -> Self {
        Self::with_input(create_sample_input())
    }

    pub fn run(&mut self) -> EtlResult<PipelineReport> {
        etl::run(&self.options, &mut self.store)
    }

    /// The fact row of `artist` on `uri` at `date`, looked up by natural keys.
    #[allow(dead_code)]
    pub fn fact(&self, uri: &str, artist: &str, date: &str) -> Option<FactChartRanking> {
        let track_sk = self
            .store
            .fetch_tracks()
            .unwrap()
            .into_iter()
            .find(|t| t.uri == uri)?
            .track_sk;
        let artist_sk = self
            .store
            .fetch_artists()
            .unwrap()
            .into_iter()
            .find(|a| a.artist_name == artist)?
            .artist_sk;
        let key = date_key(parse(date));
        self.store
            .fetch_facts()
            .unwrap()
            .into_iter()
            .find(|f| f.track_sk == track_sk && f.artist_sk == artist_sk && f.date_key == key)
    }
}

pub fn parse(date: &str) -> NaiveDate {
    date.parse().unwrap()
}
