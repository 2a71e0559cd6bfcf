//! Shared constants for end-to-end tests
//!
//! When the sample chart data changes, update only this file and
//! `fixtures.rs`.

#![allow(dead_code)]

// ============================================================================
// Window
// ============================================================================

pub const WINDOW_START: &str = "2025-12-01";
pub const WINDOW_DAYS: u32 = 30;

/// Days present in the sample input, in order.
pub const SAMPLE_DAYS: [&str; 5] = [
    "2025-12-01",
    "2025-12-14",
    "2025-12-15",
    "2025-12-23",
    "2025-12-24",
];

// ============================================================================
// Tracks
// ============================================================================

pub const FLOWERS_URI: &str = "spotify:track:0yLdNVWF3Srea0uzk55zFn";
pub const FLOWERS_NAME: &str = "Flowers";

pub const DUET_URI: &str = "spotify:track:1duetduetduetduetduet1";
pub const DUET_NAME: &str = "Better Together";

/// First charts on the 15th.
pub const NEWCOMER_URI: &str = "spotify:track:2newnewnewnewnewnewnew";
pub const NEWCOMER_NAME: &str = "Fresh Start";

// ============================================================================
// Artists
// ============================================================================

pub const MILEY_CYRUS: &str = "Miley Cyrus";
pub const ARTIST_A: &str = "Artist A";
pub const ARTIST_B: &str = "Artist B";
pub const NEWCOMER_ARTIST: &str = "Newcomer";

/// Streams of the duet on 2025-12-24.
pub const DUET_STREAMS_DAY_24: u64 = 10_000_000;
