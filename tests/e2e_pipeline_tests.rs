//! End-to-end tests for a full batch run
//!
//! Input files are written to a temporary directory, run through every
//! stage and read back from the SQLite warehouse.

mod common;

use chart_warehouse::etl::{DimensionKind, EtlError, Stage};
use common::{
    write_chart_day, TestWarehouse, ARTIST_A, ARTIST_B, DUET_STREAMS_DAY_24, DUET_URI,
    FLOWERS_NAME, FLOWERS_URI, MILEY_CYRUS, NEWCOMER_ARTIST, NEWCOMER_URI, SAMPLE_DAYS,
};
use std::collections::HashSet;
use tempfile::TempDir;

// =============================================================================
// Successful Batch
// =============================================================================

#[test]
fn test_sample_batch_report() {
    let mut warehouse = TestWarehouse::sample();
    let report = warehouse.run().unwrap();

    assert!(report.loaded);
    assert_eq!(report.window_start.to_string(), "2025-12-01");
    assert_eq!(report.window_end.to_string(), "2025-12-30");
    assert_eq!(report.day_files, SAMPLE_DAYS.len());
    assert_eq!(report.skipped_files, 1);
    assert_eq!(report.rows_loaded, 13);
    assert_eq!(report.rows_dropped, 1);
    assert_eq!(report.duplicate_grain_rows, 0);

    let counts = warehouse.store.get_counts().unwrap();
    assert_eq!(counts, report.counts);
    assert_eq!(counts.dates, 30);
    assert_eq!(counts.artists, 4);
    assert_eq!(counts.tracks, 3);
    assert_eq!(counts.facts, 18);
}

#[test]
fn test_dimensions_have_unique_natural_keys() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();

    let artists = warehouse.store.fetch_artists().unwrap();
    let names: HashSet<_> = artists.iter().map(|a| a.artist_name.as_str()).collect();
    assert_eq!(names.len(), artists.len());

    let tracks = warehouse.store.fetch_tracks().unwrap();
    let uris: HashSet<_> = tracks.iter().map(|t| t.uri.as_str()).collect();
    assert_eq!(uris.len(), tracks.len());
}

#[test]
fn test_surrogate_keys_follow_first_appearance() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();

    let artists: Vec<_> = warehouse
        .store
        .fetch_artists()
        .unwrap()
        .into_iter()
        .map(|a| (a.artist_sk, a.artist_name))
        .collect();
    assert_eq!(
        artists,
        vec![
            (1, MILEY_CYRUS.to_string()),
            (2, ARTIST_A.to_string()),
            (3, ARTIST_B.to_string()),
            (4, NEWCOMER_ARTIST.to_string()),
        ]
    );

    let tracks = warehouse.store.fetch_tracks().unwrap();
    assert_eq!(tracks[0].uri, FLOWERS_URI);
    assert_eq!(tracks[0].track_name, FLOWERS_NAME);
    assert_eq!(tracks[0].source, "Test Records");
    assert_eq!(tracks[2].uri, NEWCOMER_URI);
}

#[test]
fn test_flowers_holds_rank_two() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();

    let fact = warehouse
        .fact(FLOWERS_URI, MILEY_CYRUS, "2025-12-24")
        .unwrap();
    assert_eq!(fact.rank, 2);
    assert_eq!(fact.previous_rank, Some(2));
    assert_eq!(fact.rank_change(), Some(0));
    assert_eq!(fact.peak_rank, 1);
    assert_eq!(fact.days_on_chart, 5);
}

#[test]
fn test_collaboration_credits_both_artists() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();

    for artist in [ARTIST_A, ARTIST_B] {
        let fact = warehouse.fact(DUET_URI, artist, "2025-12-24").unwrap();
        assert_eq!(fact.streams, DUET_STREAMS_DAY_24);
        assert_eq!(fact.rank, 1);
        assert_eq!(fact.days_on_chart, 5);
    }
}

#[test]
fn test_new_entry_on_day_fifteen() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();

    assert!(warehouse
        .fact(NEWCOMER_URI, NEWCOMER_ARTIST, "2025-12-14")
        .is_none());

    let entry = warehouse
        .fact(NEWCOMER_URI, NEWCOMER_ARTIST, "2025-12-15")
        .unwrap();
    assert_eq!(entry.days_on_chart, 1);
    assert_eq!(entry.previous_rank, None);
    assert_eq!(entry.rank_change(), None);
    assert_eq!(entry.peak_rank, 3);

    let later = warehouse
        .fact(NEWCOMER_URI, NEWCOMER_ARTIST, "2025-12-24")
        .unwrap();
    assert_eq!(later.previous_rank, Some(4));
    assert_eq!(later.rank_change(), Some(1));
    assert_eq!(later.peak_rank, 3);
    assert_eq!(later.days_on_chart, 3);
}

#[test]
fn test_peak_rank_is_running_minimum() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();

    let mut previous_peak: Option<u32> = None;
    for day in SAMPLE_DAYS {
        let fact = warehouse.fact(FLOWERS_URI, MILEY_CYRUS, day).unwrap();
        let expected = previous_peak.map_or(fact.rank, |p| p.min(fact.rank));
        assert_eq!(fact.peak_rank, expected, "peak on {}", day);
        previous_peak = Some(fact.peak_rank);
    }
}

#[test]
fn test_no_orphans_after_load() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();
    assert!(warehouse.store.find_orphan_facts().unwrap().is_empty());
}

#[test]
fn test_rerun_into_fresh_warehouse_is_deterministic() {
    let mut first = TestWarehouse::sample();
    first.run().unwrap();
    let mut second = TestWarehouse::sample();
    second.run().unwrap();

    assert_eq!(
        first.store.fetch_facts().unwrap(),
        second.store.fetch_facts().unwrap()
    );
    assert_eq!(
        first.store.fetch_artists().unwrap(),
        second.store.fetch_artists().unwrap()
    );
}

// =============================================================================
// Load Modes
// =============================================================================

#[test]
fn test_dry_run_leaves_warehouse_empty() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.options.dry_run = true;

    let report = warehouse.run().unwrap();
    assert!(!report.loaded);
    assert_eq!(report.counts.facts, 18);
    assert!(warehouse.store.get_counts().unwrap().is_empty());
}

#[test]
fn test_second_append_fails_with_duplicate_key() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();
    let before = warehouse.store.get_counts().unwrap();

    let err = warehouse.run().unwrap_err();
    assert_eq!(err.stage(), Stage::WarehouseLoad);
    assert!(matches!(
        err,
        EtlError::DuplicateKey {
            table: "dim_date",
            ..
        }
    ));
    assert_eq!(warehouse.store.get_counts().unwrap(), before);
}

#[test]
fn test_clear_target_reloads_cleanly() {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();
    let first_facts = warehouse.store.fetch_facts().unwrap();

    warehouse.options.clear_target = true;
    warehouse.run().unwrap();

    assert_eq!(warehouse.store.fetch_facts().unwrap(), first_facts);
}

// =============================================================================
// Failed Batches
// =============================================================================

#[test]
fn test_blank_artist_aborts_without_writes() {
    let input_dir = TempDir::new().unwrap();
    write_chart_day(
        input_dir.path(),
        "2025-12-01",
        &[
            "1,spotify:track:ok,Artist A,Fine,Label,100".to_string(),
            "2,spotify:track:bad,\"Artist A, \",Trailing Comma,Label,100".to_string(),
        ],
    );
    let mut warehouse = TestWarehouse::with_input(input_dir);

    let err = warehouse.run().unwrap_err();
    assert_eq!(err.stage(), Stage::DimensionBuild);
    assert!(matches!(err, EtlError::EmptyArtistName { .. }));
    assert!(warehouse.store.get_counts().unwrap().is_empty());
}

#[test]
fn test_day_outside_window_is_an_orphan() {
    let mut warehouse = TestWarehouse::sample();
    // 2025-12-01 to 2025-12-10, everything after the first day falls outside
    warehouse.options.window_days = 10;

    let err = warehouse.run().unwrap_err();
    assert_eq!(err.stage(), Stage::IntegrityValidation);
    let EtlError::ReferentialIntegrity { orphans } = err else {
        panic!("expected referential integrity error");
    };
    assert_eq!(orphans.len(), 15);
    assert!(orphans.iter().all(|o| o.missing == vec![DimensionKind::Date]));
    assert!(warehouse.store.get_counts().unwrap().is_empty());
}

#[test]
fn test_two_files_for_one_day_abort_the_batch() {
    let mut warehouse = TestWarehouse::sample();
    std::fs::write(
        warehouse.input_dir.path().join("regional-us-daily-2025-12-24.csv"),
        "rank,uri,artist_names,track_name,source,streams\n1,u,A,S,L,1\n",
    )
    .unwrap();

    let err = warehouse.run().unwrap_err();
    assert_eq!(err.stage(), Stage::RawLoad);
    assert!(warehouse.store.get_counts().unwrap().is_empty());
}
