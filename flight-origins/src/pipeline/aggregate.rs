//! Counting and ranking arrivals per origin country

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::airport::AirportCode;
use crate::error::{Error, Result};

/// Arrival count for one origin country
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryArrivals {
    /// Country name as reported by the provider
    pub country: String,
    /// Number of scheduled arrivals from that country
    pub flights: usize,
}

/// Per-country counters that remember the order countries first appeared in
#[derive(Debug, Default)]
pub struct CountryCount {
    entries: Vec<CountryArrivals>,
    index: HashMap<String, usize>,
}

impl CountryCount {
    /// Create an empty count
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one arrival from `country`
    pub fn record(&mut self, country: &str) {
        match self.index.get(country) {
            Some(&slot) => self.entries[slot].flights += 1,
            None => {
                self.index.insert(country.to_string(), self.entries.len());
                self.entries.push(CountryArrivals {
                    country: country.to_string(),
                    flights: 1,
                });
            }
        }
    }

    /// Current count for `country` (zero when never seen)
    pub fn get(&self, country: &str) -> usize {
        self.index
            .get(country)
            .map(|&slot| self.entries[slot].flights)
            .unwrap_or(0)
    }

    /// Number of distinct countries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been counted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank countries by count, highest first.
    ///
    /// The sort is stable, so countries with equal counts stay in first-seen
    /// order.
    pub fn into_ranked(self) -> RankedResult {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.flights.cmp(&a.flights));
        RankedResult(entries.into())
    }
}

impl<'a> FromIterator<&'a str> for CountryCount {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut counts = Self::new();
        for country in iter {
            counts.record(country);
        }
        counts
    }
}

/// Immutable ranking of origin countries.
///
/// Cloning shares the underlying slice, so the same snapshot can sit in the
/// cache and be handed to any number of requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RankedResult(Arc<[CountryArrivals]>);

impl RankedResult {
    /// Ranked entries, highest count first
    pub fn as_slice(&self) -> &[CountryArrivals] {
        &self.0
    }

    /// Iterate over ranked entries
    pub fn iter(&self) -> std::slice::Iter<'_, CountryArrivals> {
        self.0.iter()
    }

    /// Number of countries in the ranking
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the ranking has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total arrivals across all countries
    pub fn total_flights(&self) -> usize {
        self.0.iter().map(|entry| entry.flights).sum()
    }

    /// Entries as `(country, count)` pairs
    pub fn pairs(&self) -> Vec<(&str, usize)> {
        self.0
            .iter()
            .map(|entry| (entry.country.as_str(), entry.flights))
            .collect()
    }
}

impl<'a> IntoIterator for &'a RankedResult {
    type Item = &'a CountryArrivals;
    type IntoIter = std::slice::Iter<'a, CountryArrivals>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Count `countries` and rank them.
///
/// An input with no countries at all is reported as [`Error::NoDataFound`]
/// for `code` rather than as an empty ranking.
pub fn rank<'a, I>(code: &AirportCode, countries: I) -> Result<RankedResult>
where
    I: IntoIterator<Item = &'a str>,
{
    let counts: CountryCount = countries.into_iter().collect();
    if counts.is_empty() {
        return Err(Error::NoDataFound(code.clone()));
    }
    Ok(counts.into_ranked())
}
