//! Dimension building and surrogate-key assignment.
//!
//! Keys are handed out by a single sequential pass over the full,
//! date-ordered observation set, in first-seen order starting at 1. The
//! resulting [`KeyMap`]s are passed explicitly to the fact builder.

use super::error::{EtlError, EtlResult};
use super::raw_loader::ChartObservation;
use crate::warehouse::{ArtistDim, DateDim, TrackDim};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, info};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Ten years of chart days.
pub const MAX_WINDOW_DAYS: u32 = 3660;
pub const DEFAULT_ARTIST_DELIMITER: char = ',';

/// Natural key to surrogate key mapping, in assignment order.
#[derive(Clone, Debug)]
pub struct KeyMap<K> {
    keys: HashMap<K, i64>,
    order: Vec<K>,
}

impl<K> Default for KeyMap<K> {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyMap<K> {
    /// Returns the surrogate key of `natural_key`, assigning the next one if unseen.
    pub fn assign(&mut self, natural_key: &K) -> (i64, bool) {
        if let Some(sk) = self.keys.get(natural_key) {
            return (*sk, false);
        }
        let sk = self.order.len() as i64 + 1;
        self.keys.insert(natural_key.clone(), sk);
        self.order.push(natural_key.clone());
        (sk, true)
    }

    pub fn get<Q>(&self, natural_key: &Q) -> Option<i64>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.keys.get(natural_key).copied()
    }

    /// (surrogate key, natural key) pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &K)> {
        self.order
            .iter()
            .enumerate()
            .map(|(index, key)| (index as i64 + 1, key))
    }
}

/// Inclusive range of chart days the date dimension covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
    days: u32,
}

impl DateWindow {
    /// Fails unless `days` is in `1..=MAX_WINDOW_DAYS` and the last day is
    /// a representable date.
    pub fn new(start: NaiveDate, days: u32) -> EtlResult<Self> {
        let invalid = |reason: String| EtlError::InvalidWindow { start, days, reason };
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(invalid(format!("days must be in 1..={}", MAX_WINDOW_DAYS)));
        }
        let end = start
            .checked_add_signed(Duration::days(days as i64 - 1))
            .ok_or_else(|| invalid("last day is out of the calendar range".to_string()))?;
        Ok(Self { start, end, days })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.days as usize)
    }
}

/// Splits a collaboration string into trimmed artist names.
///
/// Order is preserved and repeats within one string collapse to a single
/// entry. A blank token is an error, never silently skipped.
pub fn split_artists(observation: &ChartObservation, delimiter: char) -> EtlResult<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for token in observation.artist_names.split(delimiter) {
        let name = token.trim();
        if name.is_empty() {
            return Err(EtlError::EmptyArtistName {
                raw: observation.artist_names.clone(),
                uri: observation.uri.clone(),
                date: observation.date,
            });
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Generated from the window alone; re-running yields identical rows.
pub fn build_date_dim(window: &DateWindow) -> Vec<DateDim> {
    window.iter_days().map(DateDim::from_date).collect()
}

pub fn build_artist_keys<'a, I>(observations: I, delimiter: char) -> EtlResult<KeyMap<String>>
where
    I: IntoIterator<Item = &'a ChartObservation>,
{
    let mut keys = KeyMap::default();
    for observation in observations {
        for name in split_artists(observation, delimiter)? {
            keys.assign(&name);
        }
    }
    Ok(keys)
}

/// Track dimension keyed by URI, plus the number of later rows whose
/// track_name differed from the first-seen one.
pub fn build_track_keys<'a, I>(observations: I) -> (KeyMap<String>, Vec<TrackDim>, usize)
where
    I: IntoIterator<Item = &'a ChartObservation>,
{
    let mut keys = KeyMap::default();
    let mut tracks: Vec<TrackDim> = Vec::new();
    let mut renamed = 0;

    for observation in observations {
        let (track_sk, is_new) = keys.assign(&observation.uri);
        if is_new {
            tracks.push(TrackDim {
                track_sk,
                uri: observation.uri.clone(),
                track_name: observation.track_name.clone(),
                source: observation.source.clone(),
            });
            continue;
        }
        let first_seen = &tracks[(track_sk - 1) as usize];
        if first_seen.track_name != observation.track_name {
            renamed += 1;
            debug!(
                "Track {} reported as '{}' on {}, keeping first-seen name '{}'",
                observation.uri, observation.track_name, observation.date, first_seen.track_name
            );
        }
    }
    (keys, tracks, renamed)
}

/// The three dimensions of one batch together with their lookup maps.
#[derive(Clone, Debug)]
pub struct Dimensions {
    pub dates: Vec<DateDim>,
    pub artists: Vec<ArtistDim>,
    pub tracks: Vec<TrackDim>,
    pub artist_keys: KeyMap<String>,
    pub track_keys: KeyMap<String>,
    /// Rows whose track_name lost to the first-seen name of their URI.
    pub renamed_track_rows: usize,
}

impl Dimensions {
    pub fn build(
        observations: &[&ChartObservation],
        window: &DateWindow,
        delimiter: char,
    ) -> EtlResult<Self> {
        let dates = build_date_dim(window);
        let artist_keys = build_artist_keys(observations.iter().copied(), delimiter)?;
        let (track_keys, tracks, renamed_track_rows) =
            build_track_keys(observations.iter().copied());

        let artists = artist_keys
            .iter()
            .map(|(artist_sk, name)| ArtistDim {
                artist_sk,
                artist_name: name.clone(),
            })
            .collect::<Vec<_>>();

        info!(
            "Built dimensions: {} dates ({} to {}), {} artists, {} tracks",
            dates.len(),
            window.start(),
            window.end(),
            artists.len(),
            tracks.len()
        );

        Ok(Dimensions {
            dates,
            artists,
            tracks,
            artist_keys,
            track_keys,
            renamed_track_rows,
        })
    }
}
