mod analytics;
mod models;
mod schema;
mod store;

pub use analytics::{ArtistMarketShare, DateRange, OrphanRow, RankMovement};
pub use models::*;
pub use schema::WAREHOUSE_VERSIONED_SCHEMAS;
pub use store::{LoadMode, SqliteWarehouseStore};
