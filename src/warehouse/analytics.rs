//! Analytical queries over a loaded warehouse.

use super::models::date_key;
use super::store::SqliteWarehouseStore;
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::params;
use serde::Serialize;

/// Inclusive range of chart dates; unbounded sides cover everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    fn bounds(&self) -> (i32, i32) {
        (
            self.from.map(date_key).unwrap_or(i32::MIN),
            self.to.map(date_key).unwrap_or(i32::MAX),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtistMarketShare {
    pub artist_name: String,
    /// Streams split evenly across each track's credited artists.
    pub attributed_streams: f64,
    pub share_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankMovement {
    pub uri: String,
    pub track_name: String,
    pub chart_date: String,
    pub rank: u32,
    pub previous_rank: Option<u32>,
    /// `previous_rank - rank`; positive when the track climbed.
    pub rank_change: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrphanRow {
    pub ranking_sk: i64,
    pub track_sk: i64,
    pub artist_sk: i64,
    pub date_key: i32,
}

const MARKET_SHARE_SQL: &str = "
    WITH track_days AS (
        SELECT track_sk, date_key, COUNT(*) AS artist_count
        FROM fact_chart_rankings
        WHERE date_key BETWEEN ?1 AND ?2
        GROUP BY track_sk, date_key
    ),
    attributed AS (
        SELECT f.artist_sk, CAST(f.streams AS REAL) / td.artist_count AS streams
        FROM fact_chart_rankings f
        JOIN track_days td ON td.track_sk = f.track_sk AND td.date_key = f.date_key
    )
    SELECT a.artist_name,
           SUM(x.streams) AS attributed_streams,
           100.0 * SUM(x.streams) / (SELECT SUM(streams) FROM attributed) AS share_pct
    FROM attributed x
    JOIN dim_artists a ON a.artist_sk = x.artist_sk
    GROUP BY a.artist_sk, a.artist_name
    ORDER BY attributed_streams DESC, a.artist_name";

// LAG runs before the range filter so the first day in range still sees its predecessor.
const RANK_MOVEMENT_SQL: &str = "
    WITH track_days AS (
        SELECT DISTINCT track_sk, date_key, rank
        FROM fact_chart_rankings
    ),
    moves AS (
        SELECT track_sk, date_key, rank,
               LAG(rank) OVER (PARTITION BY track_sk ORDER BY date_key) AS previous_rank
        FROM track_days
    )
    SELECT t.uri, t.track_name, d.chart_date, m.rank, m.previous_rank,
           m.previous_rank - m.rank AS rank_change
    FROM moves m
    JOIN dim_tracks t ON t.track_sk = m.track_sk
    JOIN dim_date d ON d.date_key = m.date_key
    WHERE m.date_key BETWEEN ?1 AND ?2
    ORDER BY m.date_key, m.rank, t.uri
    LIMIT ?3";

const ORPHAN_FACTS_SQL: &str = "
    SELECT f.ranking_sk, f.track_sk, f.artist_sk, f.date_key
    FROM fact_chart_rankings f
    LEFT JOIN dim_tracks t ON t.track_sk = f.track_sk
    LEFT JOIN dim_artists a ON a.artist_sk = f.artist_sk
    LEFT JOIN dim_date d ON d.date_key = f.date_key
    WHERE t.track_sk IS NULL OR a.artist_sk IS NULL OR d.date_key IS NULL
    ORDER BY f.ranking_sk";

impl SqliteWarehouseStore {
    /// Per-artist share of all streams in `range`, collaborations split evenly.
    pub fn market_share(&self, range: &DateRange) -> Result<Vec<ArtistMarketShare>> {
        let (from, to) = range.bounds();
        let mut stmt = self.conn.prepare(MARKET_SHARE_SQL)?;
        let shares = stmt
            .query_map(params![from, to], |r| {
                Ok(ArtistMarketShare {
                    artist_name: r.get(0)?,
                    attributed_streams: r.get(1)?,
                    share_pct: r.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shares)
    }

    /// Day-over-day rank change per track.
    pub fn rank_movement(&self, range: &DateRange, limit: Option<usize>) -> Result<Vec<RankMovement>> {
        let (from, to) = range.bounds();
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(RANK_MOVEMENT_SQL)?;
        let moves = stmt
            .query_map(params![from, to, limit], |r| {
                Ok(RankMovement {
                    uri: r.get(0)?,
                    track_name: r.get(1)?,
                    chart_date: r.get(2)?,
                    rank: r.get(3)?,
                    previous_rank: r.get(4)?,
                    rank_change: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(moves)
    }

    /// Left-join-null check for fact rows whose dimension rows are missing.
    pub fn find_orphan_facts(&self) -> Result<Vec<OrphanRow>> {
        let mut stmt = self.conn.prepare(ORPHAN_FACTS_SQL)?;
        let orphans = stmt
            .query_map([], |r| {
                Ok(OrphanRow {
                    ranking_sk: r.get(0)?,
                    track_sk: r.get(1)?,
                    artist_sk: r.get(2)?,
                    date_key: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orphans)
    }
}
