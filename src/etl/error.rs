//! Error taxonomy for a batch run.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RawLoad,
    DimensionBuild,
    FactBuild,
    IntegrityValidation,
    WarehouseLoad,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::RawLoad => "raw load",
            Stage::DimensionBuild => "dimension build",
            Stage::FactBuild => "fact build",
            Stage::IntegrityValidation => "integrity validation",
            Stage::WarehouseLoad => "warehouse load",
        };
        f.write_str(name)
    }
}

/// Which dimension a lookup was performed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Date,
    Artist,
    Track,
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionKind::Date => f.write_str("dim_date"),
            DimensionKind::Artist => f.write_str("dim_artists"),
            DimensionKind::Track => f.write_str("dim_tracks"),
        }
    }
}

/// A fact row whose foreign keys do not all resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanFact {
    pub ranking_sk: i64,
    pub track_sk: i64,
    pub artist_sk: i64,
    pub date_key: i32,
    pub missing: Vec<DimensionKind>,
}

impl fmt::Display for OrphanFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = self
            .missing
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "ranking_sk={} (track_sk={}, artist_sk={}, date_key={}) missing in [{}]",
            self.ranking_sk, self.track_sk, self.artist_sk, self.date_key, missing
        )
    }
}

fn format_orphans(orphans: &[OrphanFact]) -> String {
    orphans
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("Malformed input in {path:?}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    #[error("Blank artist name in {raw:?} (track {uri}, chart date {date})")]
    EmptyArtistName {
        raw: String,
        uri: String,
        date: chrono::NaiveDate,
    },

    #[error("Invalid date window of {days} day(s) from {start}: {reason}")]
    InvalidWindow {
        start: chrono::NaiveDate,
        days: u32,
        reason: String,
    },

    #[error("Cannot resolve {kind} key {key:?}")]
    DimensionLookup { kind: DimensionKind, key: String },

    #[error("{} orphaned fact row(s): {}", .orphans.len(), format_orphans(.orphans))]
    ReferentialIntegrity { orphans: Vec<OrphanFact> },

    /// Two rows of the in-memory batch share a key.
    #[error("Batch assigns key {key} twice in {table}")]
    BatchDuplicateKey { table: &'static str, key: String },

    /// The warehouse already holds the key.
    #[error("Duplicate key {key} in {table}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl EtlError {
    pub fn stage(&self) -> Stage {
        match self {
            EtlError::MalformedInput { .. } | EtlError::Io(_) | EtlError::Csv(_) => {
                Stage::RawLoad
            }
            EtlError::EmptyArtistName { .. } | EtlError::InvalidWindow { .. } => {
                Stage::DimensionBuild
            }
            EtlError::DimensionLookup { .. } => Stage::FactBuild,
            EtlError::ReferentialIntegrity { .. } | EtlError::BatchDuplicateKey { .. } => {
                Stage::IntegrityValidation
            }
            EtlError::DuplicateKey { .. } | EtlError::Sqlite(_) => Stage::WarehouseLoad,
        }
    }
}

pub type EtlResult<T> = Result<T, EtlError>;
