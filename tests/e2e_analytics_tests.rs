//! End-to-end tests for the analytical queries over a loaded warehouse

mod common;

use chart_warehouse::warehouse::DateRange;
use common::{
    TestWarehouse, ARTIST_A, ARTIST_B, DUET_NAME, FLOWERS_NAME, MILEY_CYRUS, NEWCOMER_NAME,
};

fn loaded() -> TestWarehouse {
    let mut warehouse = TestWarehouse::sample();
    warehouse.run().unwrap();
    warehouse
}

fn day(date: &str) -> DateRange {
    let date = date.parse().ok();
    DateRange::new(date, date)
}

#[test]
fn test_market_share_splits_duet_streams() {
    let warehouse = loaded();
    let shares = warehouse.store.market_share(&day("2025-12-24")).unwrap();

    let streams_of = |name: &str| {
        shares
            .iter()
            .find(|s| s.artist_name == name)
            .unwrap()
            .attributed_streams
    };
    assert_eq!(streams_of(ARTIST_A), 5_000_000.0);
    assert_eq!(streams_of(ARTIST_B), 5_000_000.0);
    assert_eq!(streams_of(MILEY_CYRUS), 6_000_000.0);
    // Highest share first
    assert_eq!(shares[0].artist_name, MILEY_CYRUS);
}

#[test]
fn test_market_share_sums_to_one_hundred() {
    let warehouse = loaded();
    for range in [DateRange::default(), day("2025-12-01"), day("2025-12-15")] {
        let total: f64 = warehouse
            .store
            .market_share(&range)
            .unwrap()
            .iter()
            .map(|s| s.share_pct)
            .sum();
        assert!((total - 100.0).abs() <= 0.01, "total was {}", total);
    }
}

#[test]
fn test_rank_movement_on_christmas_eve() {
    let warehouse = loaded();
    let moves = warehouse
        .store
        .rank_movement(&day("2025-12-24"), None)
        .unwrap();

    // One row per track, ordered by rank
    let names: Vec<_> = moves.iter().map(|m| m.track_name.as_str()).collect();
    assert_eq!(names, vec![DUET_NAME, FLOWERS_NAME, NEWCOMER_NAME]);

    let flowers = &moves[1];
    assert_eq!(flowers.previous_rank, Some(2));
    assert_eq!(flowers.rank_change, Some(0));

    let newcomer = &moves[2];
    assert_eq!(newcomer.previous_rank, Some(4));
    assert_eq!(newcomer.rank_change, Some(1));
}

#[test]
fn test_rank_movement_new_entry_has_no_previous_rank() {
    let warehouse = loaded();
    let moves = warehouse
        .store
        .rank_movement(&day("2025-12-15"), None)
        .unwrap();

    let newcomer = moves
        .iter()
        .find(|m| m.track_name == NEWCOMER_NAME)
        .unwrap();
    assert_eq!(newcomer.previous_rank, None);
    assert_eq!(newcomer.rank_change, None);
}

#[test]
fn test_rank_movement_limit() {
    let warehouse = loaded();
    let all = warehouse
        .store
        .rank_movement(&DateRange::default(), None)
        .unwrap();
    // 2 + 2 + 3 + 3 + 3 track-days
    assert_eq!(all.len(), 13);

    let limited = warehouse
        .store
        .rank_movement(&DateRange::default(), Some(4))
        .unwrap();
    assert_eq!(limited, all[..4].to_vec());
}
