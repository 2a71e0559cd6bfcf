//! SQLite schema definitions for the chart warehouse.
//!
//! Three dimensions and one fact table. Surrogate keys are assigned by the
//! ETL and inserted explicitly; natural keys are kept unique for lookups.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

// =============================================================================
// Dimension Tables
// =============================================================================

const DIM_DATE_TABLE: Table = Table {
    name: "dim_date",
    columns: &[
        sqlite_column!("date_key", &SqlType::Integer, is_primary_key = true), // YYYYMMDD
        sqlite_column!("chart_date", &SqlType::Text, non_null = true),        // '2025-12-24'
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("month", &SqlType::Integer, non_null = true),
        sqlite_column!("quarter", &SqlType::Integer, non_null = true),
        sqlite_column!("day", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "day_of_week",
            &SqlType::Integer,
            non_null = true,
            check = Some("day_of_week BETWEEN 1 AND 7")
        ),
        sqlite_column!("month_name", &SqlType::Text, non_null = true),
        sqlite_column!("day_name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["chart_date"]],
};

const DIM_ARTISTS_TABLE: Table = Table {
    name: "dim_artists",
    columns: &[
        sqlite_column!("artist_sk", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["artist_name"]],
};

const DIM_TRACKS_TABLE: Table = Table {
    name: "dim_tracks",
    columns: &[
        sqlite_column!("track_sk", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("uri", &SqlType::Text, non_null = true), // spotify:track:<base62>
        sqlite_column!("track_name", &SqlType::Text, non_null = true),
        sqlite_column!("source", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["uri"]],
};

// =============================================================================
// Fact Table
// =============================================================================

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "dim_tracks",
    foreign_column: "track_sk",
    on_update: ForeignKeyOnChange::Restrict,
    on_delete: ForeignKeyOnChange::Restrict,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "dim_artists",
    foreign_column: "artist_sk",
    on_update: ForeignKeyOnChange::Restrict,
    on_delete: ForeignKeyOnChange::Restrict,
};

const DATE_FK: ForeignKey = ForeignKey {
    foreign_table: "dim_date",
    foreign_column: "date_key",
    on_update: ForeignKeyOnChange::Restrict,
    on_delete: ForeignKeyOnChange::Restrict,
};

const FACT_CHART_RANKINGS_TABLE: Table = Table {
    name: "fact_chart_rankings",
    columns: &[
        sqlite_column!("ranking_sk", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "track_sk",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!(
            "artist_sk",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "date_key",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&DATE_FK)
        ),
        sqlite_column!(
            "rank",
            &SqlType::Integer,
            non_null = true,
            check = Some("rank > 0")
        ),
        sqlite_column!(
            "streams",
            &SqlType::Integer,
            non_null = true,
            check = Some("streams >= 0")
        ),
        sqlite_column!("previous_rank", &SqlType::Integer), // NULL for a new chart entry
        sqlite_column!(
            "peak_rank",
            &SqlType::Integer,
            non_null = true,
            check = Some("peak_rank > 0")
        ),
        sqlite_column!(
            "days_on_chart",
            &SqlType::Integer,
            non_null = true,
            check = Some("days_on_chart >= 1")
        ),
    ],
    indices: &[
        ("idx_fact_rankings_track", "track_sk"),
        ("idx_fact_rankings_artist", "artist_sk"),
        ("idx_fact_rankings_date", "date_key"),
    ],
    unique_constraints: &[&["track_sk", "artist_sk", "date_key"]],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

/// Dimensions come first so that fact foreign keys resolve at creation time.
pub const WAREHOUSE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        DIM_DATE_TABLE,
        DIM_ARTISTS_TABLE,
        DIM_TRACKS_TABLE,
        FACT_CHART_RANKINGS_TABLE,
    ],
    migration: None,
}];
