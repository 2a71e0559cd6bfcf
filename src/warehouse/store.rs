//! SQLite-backed warehouse store.
//!
//! Writes are insert-only and happen in a single transaction per batch:
//! either every table of the batch is persisted or none is.

use super::models::*;
use super::schema::WAREHOUSE_VERSIONED_SCHEMAS;
use crate::etl::{EtlError, EtlResult};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{ffi, params, Connection, Transaction};
use std::path::Path;
use tracing::info;

/// How a batch treats rows already in the warehouse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadMode {
    /// Insert only; any surrogate-key collision fails the batch.
    Append,
    /// Empty the warehouse first, within the same transaction.
    Replace,
}

pub struct SqliteWarehouseStore {
    pub(super) conn: Connection,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = WAREHOUSE_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &WAREHOUSE_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating warehouse schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has {} tables but no warehouse schema version, refusing to use it",
            table_count
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;
    if current_version > latest_version {
        bail!(
            "Warehouse schema version {} is newer than supported version {}",
            current_version,
            latest_version
        );
    }
    if current_version == latest_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in WAREHOUSE_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating warehouse from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
        }
        current_version = schema.version;
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

/// Turns primary-key and unique violations into [`EtlError::DuplicateKey`].
fn map_insert_error(err: rusqlite::Error, table: &'static str, key: String) -> EtlError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            EtlError::DuplicateKey { table, key }
        }
        _ => EtlError::Sqlite(err),
    }
}

fn insert_dates(tx: &Transaction, dates: &[DateDim]) -> EtlResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO dim_date (date_key, chart_date, year, month, quarter, day, day_of_week, month_name, day_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for date in dates {
        stmt.execute(params![
            date.date_key,
            date.chart_date.to_string(),
            date.year,
            date.month,
            date.quarter,
            date.day,
            date.day_of_week,
            &date.month_name,
            &date.day_name,
        ])
        .map_err(|e| map_insert_error(e, "dim_date", date.date_key.to_string()))?;
    }
    Ok(())
}

fn insert_artists(tx: &Transaction, artists: &[ArtistDim]) -> EtlResult<()> {
    let mut stmt =
        tx.prepare_cached("INSERT INTO dim_artists (artist_sk, artist_name) VALUES (?1, ?2)")?;
    for artist in artists {
        stmt.execute(params![artist.artist_sk, &artist.artist_name])
            .map_err(|e| {
                map_insert_error(
                    e,
                    "dim_artists",
                    format!("{} ({})", artist.artist_sk, artist.artist_name),
                )
            })?;
    }
    Ok(())
}

fn insert_tracks(tx: &Transaction, tracks: &[TrackDim]) -> EtlResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO dim_tracks (track_sk, uri, track_name, source) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for track in tracks {
        stmt.execute(params![
            track.track_sk,
            &track.uri,
            &track.track_name,
            &track.source
        ])
        .map_err(|e| {
            map_insert_error(
                e,
                "dim_tracks",
                format!("{} ({})", track.track_sk, track.uri),
            )
        })?;
    }
    Ok(())
}

fn insert_facts(tx: &Transaction, facts: &[FactChartRanking]) -> EtlResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO fact_chart_rankings (ranking_sk, track_sk, artist_sk, date_key, rank, streams, previous_rank, peak_rank, days_on_chart)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    for fact in facts {
        stmt.execute(params![
            fact.ranking_sk,
            fact.track_sk,
            fact.artist_sk,
            fact.date_key,
            fact.rank,
            fact.streams,
            fact.previous_rank,
            fact.peak_rank,
            fact.days_on_chart,
        ])
        .map_err(|e| map_insert_error(e, "fact_chart_rankings", fact.ranking_sk.to_string()))?;
    }
    Ok(())
}

/// Facts go first so no foreign key is left dangling.
fn delete_all(tx: &Transaction) -> EtlResult<()> {
    for table in ["fact_chart_rankings", "dim_tracks", "dim_artists", "dim_date"] {
        tx.execute(&format!("DELETE FROM {}", table), [])?;
    }
    Ok(())
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
        r.get(0)
    })?;
    Ok(count as usize)
}

impl SqliteWarehouseStore {
    /// Opens (creating if needed) the warehouse database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open warehouse database {:?}", db_path.as_ref()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrate_if_needed(&mut conn)?;

        #[cfg(not(feature = "no_checks"))]
        WAREHOUSE_VERSIONED_SCHEMAS[WAREHOUSE_VERSIONED_SCHEMAS.len() - 1]
            .validate(&conn)
            .context("Warehouse schema validation failed")?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = SqliteWarehouseStore { conn };
        let counts = store.get_counts()?;
        info!(
            "Opened warehouse: {} dates, {} artists, {} tracks, {} facts",
            counts.dates, counts.artists, counts.tracks, counts.facts
        );
        Ok(store)
    }

    pub fn get_counts(&self) -> Result<WarehouseCounts> {
        Ok(WarehouseCounts {
            dates: count_rows(&self.conn, "dim_date")?,
            artists: count_rows(&self.conn, "dim_artists")?,
            tracks: count_rows(&self.conn, "dim_tracks")?,
            facts: count_rows(&self.conn, "fact_chart_rankings")?,
        })
    }

    /// Empties every table.
    pub fn clear(&mut self) -> EtlResult<()> {
        let tx = self.conn.transaction()?;
        delete_all(&tx)?;
        tx.commit()?;
        info!("Cleared warehouse");
        Ok(())
    }

    /// Inserts a whole batch: dimensions, then facts. Any failure rolls
    /// the transaction back and leaves the warehouse untouched, including
    /// the deletion done by [`LoadMode::Replace`].
    pub fn load_batch(
        &mut self,
        batch: &WarehouseBatch,
        mode: LoadMode,
    ) -> EtlResult<WarehouseCounts> {
        let tx = self.conn.transaction()?;

        if mode == LoadMode::Replace {
            delete_all(&tx)?;
        }
        insert_dates(&tx, &batch.dates)?;
        insert_artists(&tx, &batch.artists)?;
        insert_tracks(&tx, &batch.tracks)?;
        insert_facts(&tx, &batch.facts)?;

        tx.commit()?;

        let inserted = WarehouseCounts {
            dates: batch.dates.len(),
            artists: batch.artists.len(),
            tracks: batch.tracks.len(),
            facts: batch.facts.len(),
        };
        info!(
            "Loaded batch ({:?}): {} dates, {} artists, {} tracks, {} facts",
            mode, inserted.dates, inserted.artists, inserted.tracks, inserted.facts
        );
        Ok(inserted)
    }

    pub fn fetch_artists(&self) -> Result<Vec<ArtistDim>> {
        let mut stmt = self
            .conn
            .prepare("SELECT artist_sk, artist_name FROM dim_artists ORDER BY artist_sk")?;
        let artists = stmt
            .query_map([], |r| {
                Ok(ArtistDim {
                    artist_sk: r.get(0)?,
                    artist_name: r.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    pub fn fetch_tracks(&self) -> Result<Vec<TrackDim>> {
        let mut stmt = self
            .conn
            .prepare("SELECT track_sk, uri, track_name, source FROM dim_tracks ORDER BY track_sk")?;
        let tracks = stmt
            .query_map([], |r| {
                Ok(TrackDim {
                    track_sk: r.get(0)?,
                    uri: r.get(1)?,
                    track_name: r.get(2)?,
                    source: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    pub fn fetch_facts(&self) -> Result<Vec<FactChartRanking>> {
        let mut stmt = self.conn.prepare(
            "SELECT ranking_sk, track_sk, artist_sk, date_key, rank, streams, previous_rank, peak_rank, days_on_chart
             FROM fact_chart_rankings ORDER BY ranking_sk",
        )?;
        let facts = stmt
            .query_map([], |r| {
                Ok(FactChartRanking {
                    ranking_sk: r.get(0)?,
                    track_sk: r.get(1)?,
                    artist_sk: r.get(2)?,
                    date_key: r.get(3)?,
                    rank: r.get(4)?,
                    streams: r.get(5)?,
                    previous_rank: r.get(6)?,
                    peak_rank: r.get(7)?,
                    days_on_chart: r.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(facts)
    }
}
