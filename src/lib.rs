//! Chart Warehouse library
//!
//! Batch ETL from daily chart CSV snapshots into a SQLite star schema, plus
//! the analytical queries run against it.

pub mod cli_style;
pub mod config;
pub mod etl;
pub mod sqlite_persistence;
pub mod warehouse;

pub use etl::{EtlError, EtlResult, PipelineOptions, PipelineReport, Stage};
pub use warehouse::{LoadMode, SqliteWarehouseStore};
