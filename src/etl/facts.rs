//! Fact building: one row per (track, artist, date).
//!
//! Derived measures are computed over each (track, artist) partition once
//! every day is assembled, by a single date-ordered scan carrying the last
//! rank, the running best rank and the running day count. This matches
//! `LAG(rank)`, running `MIN(rank)` and running `COUNT(*)` windows
//! partitioned by (track, artist) and ordered by date.

use super::dimensions::{split_artists, Dimensions};
use super::error::{DimensionKind, EtlError, EtlResult};
use super::raw_loader::ChartObservation;
use crate::warehouse::{date_key, FactChartRanking};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// A fact row before derived measures and its own surrogate key exist.
#[derive(Clone, Debug)]
struct FactCandidate {
    track_sk: i64,
    artist_sk: i64,
    date_key: i32,
    rank: u32,
    streams: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactBuildReport {
    pub facts: usize,
    /// Candidates discarded because their (track, artist, date) was already taken.
    pub duplicate_grain_rows: usize,
}

/// Measures for one partition, in the same order as `ranks`.
fn scan_partition(ranks: &[u32]) -> Vec<(Option<u32>, u32, u32)> {
    let mut measures = Vec::with_capacity(ranks.len());
    let mut previous_rank: Option<u32> = None;
    let mut peak_rank = u32::MAX;
    let mut days_on_chart = 0;

    for &rank in ranks {
        peak_rank = peak_rank.min(rank);
        days_on_chart += 1;
        measures.push((previous_rank, peak_rank, days_on_chart));
        previous_rank = Some(rank);
    }
    measures
}

/// Builds the fact table. `observations` must be in chart-date order, as
/// produced by the raw loader; ranking keys follow that order.
pub fn build_facts(
    observations: &[&ChartObservation],
    dimensions: &Dimensions,
    delimiter: char,
) -> EtlResult<(Vec<FactChartRanking>, FactBuildReport)> {
    let mut report = FactBuildReport::default();
    let mut candidates: Vec<FactCandidate> = Vec::with_capacity(observations.len());
    let mut grain: HashSet<(i64, i64, i32)> = HashSet::new();

    for observation in observations {
        let track_sk =
            dimensions
                .track_keys
                .get(&observation.uri)
                .ok_or_else(|| EtlError::DimensionLookup {
                    kind: DimensionKind::Track,
                    key: observation.uri.clone(),
                })?;
        let date_key = date_key(observation.date);

        for artist_name in split_artists(observation, delimiter)? {
            let artist_sk = dimensions.artist_keys.get(&artist_name).ok_or_else(|| {
                EtlError::DimensionLookup {
                    kind: DimensionKind::Artist,
                    key: artist_name.clone(),
                }
            })?;

            if !grain.insert((track_sk, artist_sk, date_key)) {
                report.duplicate_grain_rows += 1;
                debug!(
                    "Duplicate chart row for {} / {} on {} (line {}), keeping the first",
                    observation.uri, artist_name, observation.date, observation.line
                );
                continue;
            }

            candidates.push(FactCandidate {
                track_sk,
                artist_sk,
                date_key,
                rank: observation.rank,
                streams: observation.streams,
            });
        }
    }

    // Partition indices by (track, artist); within a partition, date order.
    let mut partitions: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        partitions
            .entry((candidate.track_sk, candidate.artist_sk))
            .or_default()
            .push(index);
    }

    let mut measures: Vec<(Option<u32>, u32, u32)> = vec![(None, 0, 0); candidates.len()];
    for indices in partitions.values_mut() {
        indices.sort_by_key(|&i| candidates[i].date_key);
        let ranks: Vec<u32> = indices.iter().map(|&i| candidates[i].rank).collect();
        for (&index, partition_measures) in indices.iter().zip(scan_partition(&ranks)) {
            measures[index] = partition_measures;
        }
    }

    let facts: Vec<FactChartRanking> = candidates
        .into_iter()
        .zip(measures)
        .enumerate()
        .map(
            |(index, (candidate, (previous_rank, peak_rank, days_on_chart)))| FactChartRanking {
                ranking_sk: index as i64 + 1,
                track_sk: candidate.track_sk,
                artist_sk: candidate.artist_sk,
                date_key: candidate.date_key,
                rank: candidate.rank,
                streams: candidate.streams,
                previous_rank,
                peak_rank,
                days_on_chart,
            },
        )
        .collect();

    report.facts = facts.len();
    info!(
        "Built {} fact rows from {} observations ({} duplicate grain rows skipped)",
        report.facts,
        observations.len(),
        report.duplicate_grain_rows
    );

    Ok((facts, report))
}
