//! Batch transform from daily chart files to star-schema rows.

pub mod dimensions;
mod error;
pub mod facts;
pub mod integrity;
pub mod pipeline;
pub mod raw_loader;

pub use dimensions::{
    DateWindow, Dimensions, KeyMap, DEFAULT_ARTIST_DELIMITER, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS,
};
pub use error::{DimensionKind, EtlError, EtlResult, OrphanFact, Stage};
pub use facts::FactBuildReport;
pub use pipeline::{run, transform, PipelineOptions, PipelineReport, TransformOutput};
pub use raw_loader::{ChartObservation, InputLoad, LoadOptions, DEFAULT_MAX_RANK};
