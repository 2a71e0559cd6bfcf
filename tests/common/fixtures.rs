//! Chart CSV fixtures written into temporary directories

use super::constants::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "rank,uri,artist_names,track_name,source,streams";

/// Writes one day file named like the real chart exports.
pub fn write_chart_day(dir: &Path, date: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(format!("regional-global-daily-{}.csv", date));
    let mut content = String::from(HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    fs::write(&path, content).unwrap();
    path
}

fn row(rank: u32, uri: &str, artists: &str, track: &str, streams: u64) -> String {
    format!(
        "{},{},\"{}\",{},Test Records,{}",
        rank, uri, artists, track, streams
    )
}

fn flowers(rank: u32, streams: u64) -> String {
    row(rank, FLOWERS_URI, MILEY_CYRUS, FLOWERS_NAME, streams)
}

fn duet(rank: u32, streams: u64) -> String {
    let artists = format!("{}, {}", ARTIST_A, ARTIST_B);
    row(rank, DUET_URI, &artists, DUET_NAME, streams)
}

fn newcomer(rank: u32, streams: u64) -> String {
    row(rank, NEWCOMER_URI, NEWCOMER_ARTIST, NEWCOMER_NAME, streams)
}

/// Five chart days covering the scenarios the tests check:
/// - Flowers at rank 2 on both the 23rd and 24th
/// - the duet credited to two artists, 10,000,000 streams on the 24th
/// - a newcomer entering on the 15th
///
/// The 14th also carries one row with unparseable streams, and the
/// directory holds a CSV without a date in its name.
pub fn create_sample_input() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path();

    write_chart_day(
        path,
        "2025-12-01",
        &[flowers(1, 5_000_000), duet(2, 4_000_000)],
    );
    write_chart_day(
        path,
        "2025-12-14",
        &[
            duet(1, 6_000_000),
            flowers(3, 4_500_000),
            "4,spotify:track:broken,Someone,Broken,Test Records,n/a".to_string(),
        ],
    );
    write_chart_day(
        path,
        "2025-12-15",
        &[
            duet(1, 7_000_000),
            flowers(2, 5_000_000),
            newcomer(3, 1_000_000),
        ],
    );
    write_chart_day(
        path,
        "2025-12-23",
        &[
            duet(1, 9_000_000),
            flowers(2, 6_000_000),
            newcomer(4, 2_000_000),
        ],
    );
    write_chart_day(
        path,
        "2025-12-24",
        &[
            duet(1, DUET_STREAMS_DAY_24),
            flowers(2, 6_000_000),
            newcomer(3, 2_500_000),
        ],
    );

    fs::write(path.join("chart-notes.csv"), "not,a,chart\n").unwrap();

    dir
}
