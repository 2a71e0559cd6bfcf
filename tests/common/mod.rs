//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestWarehouse, FLOWERS_URI, MILEY_CYRUS};
//!
//! #[test]
//! fn test_flowers_is_loaded() {
//!     let mut warehouse = TestWarehouse::sample();
//!     warehouse.run().unwrap();
//!     assert!(warehouse.fact(FLOWERS_URI, MILEY_CYRUS, "2025-12-24").is_some());
//! }
//! ```

mod constants;
mod fixtures;
mod warehouse;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{create_sample_input, write_chart_day};
pub use warehouse::TestWarehouse;
