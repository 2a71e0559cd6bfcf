//! Referential-integrity validation, run before anything is written.

use super::dimensions::Dimensions;
use super::error::{DimensionKind, EtlError, EtlResult, OrphanFact};
use crate::warehouse::FactChartRanking;
use std::collections::HashSet;
use tracing::info;

fn unique_keys<T, K, F>(rows: &[T], table: &'static str, key_of: F) -> EtlResult<HashSet<K>>
where
    K: Eq + std::hash::Hash + ToString + Copy,
    F: Fn(&T) -> K,
{
    let mut keys = HashSet::with_capacity(rows.len());
    for row in rows {
        let key = key_of(row);
        if !keys.insert(key) {
            return Err(EtlError::BatchDuplicateKey {
                table,
                key: key.to_string(),
            });
        }
    }
    Ok(keys)
}

/// Checks that every dimension key is unique and every fact foreign key
/// resolves. All orphans are reported at once.
pub fn validate(dimensions: &Dimensions, facts: &[FactChartRanking]) -> EtlResult<()> {
    let date_keys = unique_keys(&dimensions.dates, "dim_date", |d| d.date_key)?;
    let artist_keys = unique_keys(&dimensions.artists, "dim_artists", |a| a.artist_sk)?;
    let track_keys = unique_keys(&dimensions.tracks, "dim_tracks", |t| t.track_sk)?;
    unique_keys(facts, "fact_chart_rankings", |f| f.ranking_sk)?;

    let orphans: Vec<OrphanFact> = facts
        .iter()
        .filter_map(|fact| {
            let mut missing = Vec::new();
            if !track_keys.contains(&fact.track_sk) {
                missing.push(DimensionKind::Track);
            }
            if !artist_keys.contains(&fact.artist_sk) {
                missing.push(DimensionKind::Artist);
            }
            if !date_keys.contains(&fact.date_key) {
                missing.push(DimensionKind::Date);
            }
            if missing.is_empty() {
                None
            } else {
                Some(OrphanFact {
                    ranking_sk: fact.ranking_sk,
                    track_sk: fact.track_sk,
                    artist_sk: fact.artist_sk,
                    date_key: fact.date_key,
                    missing,
                })
            }
        })
        .collect();

    if !orphans.is_empty() {
        return Err(EtlError::ReferentialIntegrity { orphans });
    }

    info!("Integrity check passed for {} fact rows", facts.len());
    Ok(())
}
