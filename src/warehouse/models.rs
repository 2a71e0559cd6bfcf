//! Star-schema rows as they are persisted in the warehouse.
//!
//! Dimension rows carry surrogate keys assigned by the ETL; the fact table
//! references them by those keys only, never by natural keys.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// =============================================================================
// Dimensions
// =============================================================================

/// Calendar dimension, one row per day of the chart window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDim {
    /// `YYYYMMDD` as an integer, e.g. `20251224`.
    pub date_key: i32,
    pub chart_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub day: u32,
    /// ISO weekday, Monday = 1 through Sunday = 7.
    pub day_of_week: u32,
    pub month_name: String,
    pub day_name: String,
}

impl DateDim {
    pub fn from_date(date: NaiveDate) -> Self {
        DateDim {
            date_key: date_key(date),
            chart_date: date,
            year: date.year(),
            month: date.month(),
            quarter: (date.month() - 1) / 3 + 1,
            day: date.day(),
            day_of_week: date.weekday().number_from_monday(),
            month_name: date.format("%B").to_string(),
            day_name: date.format("%A").to_string(),
        }
    }
}

/// Smart key for a calendar day.
pub fn date_key(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDim {
    pub artist_sk: i64,
    pub artist_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDim {
    pub track_sk: i64,
    pub uri: String,
    pub track_name: String,
    pub source: String,
}

// =============================================================================
// Fact
// =============================================================================

/// One artist's chart performance on one track on one day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactChartRanking {
    pub ranking_sk: i64,
    pub track_sk: i64,
    pub artist_sk: i64,
    pub date_key: i32,
    pub rank: u32,
    pub streams: u64,
    /// Rank on the previous day this (track, artist) pair charted, `None` for a new entry.
    pub previous_rank: Option<u32>,
    pub peak_rank: u32,
    pub days_on_chart: u32,
}

impl FactChartRanking {
    /// Positions gained since the previous appearance; negative when the entry dropped.
    pub fn rank_change(&self) -> Option<i64> {
        self.previous_rank
            .map(|previous| previous as i64 - self.rank as i64)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// Everything a single pipeline run writes, in load order.
#[derive(Clone, Debug, Default)]
pub struct WarehouseBatch {
    pub dates: Vec<DateDim>,
    pub artists: Vec<ArtistDim>,
    pub tracks: Vec<TrackDim>,
    pub facts: Vec<FactChartRanking>,
}

/// Row counts per warehouse table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WarehouseCounts {
    pub dates: usize,
    pub artists: usize,
    pub tracks: usize,
    pub facts: usize,
}

impl WarehouseCounts {
    pub fn is_empty(&self) -> bool {
        self.dates == 0 && self.artists == 0 && self.tracks == 0 && self.facts == 0
    }
}
