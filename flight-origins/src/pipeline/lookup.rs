//! Composable arrivals lookups
//!
//! [`Aggregating`] is the one place where a schedule is turned into a
//! ranking. Hardening layers such as [`Cached`] wrap any other lookup and
//! leave the aggregation itself untouched.

use async_trait::async_trait;
use std::sync::Arc;

use crate::airport::AirportCode;
use crate::cache::ArrivalsCache;
use crate::error::Result;

use super::aggregate::{rank, RankedResult};
use super::fetch::ScheduleSource;
use super::normalize::country_names;

/// Produces a ranking of origin countries for a validated airport code
#[async_trait]
pub trait ArrivalsLookup: Send + Sync {
    /// Rank the arrivals at `code` by country of origin
    async fn arrivals_by_country(&self, code: &AirportCode) -> Result<RankedResult>;
}

#[async_trait]
impl<L: ArrivalsLookup + ?Sized> ArrivalsLookup for Arc<L> {
    async fn arrivals_by_country(&self, code: &AirportCode) -> Result<RankedResult> {
        (**self).arrivals_by_country(code).await
    }
}

/// Fetch, normalize and rank with no caching
#[derive(Debug, Clone)]
pub struct Aggregating<S> {
    source: S,
}

impl<S: ScheduleSource> Aggregating<S> {
    /// Wrap a schedule source
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The wrapped source
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: ScheduleSource> ArrivalsLookup for Aggregating<S> {
    async fn arrivals_by_country(&self, code: &AirportCode) -> Result<RankedResult> {
        let payload = self.source.fetch_arrivals(code).await?;
        let ranked = rank(code, country_names(&payload))?;

        tracing::info!(
            airport = %code,
            countries = ranked.len(),
            flights = ranked.total_flights(),
            "Aggregated arrivals by origin country"
        );
        Ok(ranked)
    }
}

/// Serve rankings from an [`ArrivalsCache`], falling back to `inner` on a miss.
///
/// Only successful rankings are stored. Concurrent misses for the same code
/// each reach `inner`.
#[derive(Debug, Clone)]
pub struct Cached<L> {
    inner: L,
    cache: Arc<ArrivalsCache>,
}

impl<L: ArrivalsLookup> Cached<L> {
    /// Put `cache` in front of `inner`
    pub fn new(inner: L, cache: Arc<ArrivalsCache>) -> Self {
        Self { inner, cache }
    }

    /// The cache consulted by this lookup
    pub fn cache(&self) -> &Arc<ArrivalsCache> {
        &self.cache
    }
}

#[async_trait]
impl<L: ArrivalsLookup> ArrivalsLookup for Cached<L> {
    async fn arrivals_by_country(&self, code: &AirportCode) -> Result<RankedResult> {
        if let Some(hit) = self.cache.lookup(code).await {
            tracing::debug!(airport = %code, "Cache hit");
            return Ok(hit);
        }

        tracing::debug!(airport = %code, "Cache miss");
        let ranked = self.inner.arrivals_by_country(code).await?;
        self.cache.store(code.clone(), ranked.clone()).await;
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves a canned response and counts calls
    struct StubSource {
        response: fn() -> Result<Value>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(response: fn() -> Result<Value>) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScheduleSource for StubSource {
        async fn fetch_arrivals(&self, _code: &AirportCode) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.response)()
        }
    }

    fn three_arrivals() -> Result<Value> {
        let record = |country: &str| {
            json!({ "flight": { "airport": { "origin": { "position": {
                "country": { "name": country }
            } } } } })
        };
        Ok(json!([{ "airport": { "pluginData": { "schedule": { "arrivals": {
            "data": [record("France"), record("France"), record("Germany")]
        } } } } }]))
    }

    fn empty_schedule() -> Result<Value> {
        Ok(json!([]))
    }

    fn timed_out() -> Result<Value> {
        Err(Error::Timeout(Duration::from_secs(60)))
    }

    fn code() -> AirportCode {
        AirportCode::parse("LHR").unwrap()
    }

    #[tokio::test]
    async fn test_aggregating_ranks_payload() {
        let lookup = Aggregating::new(StubSource::new(three_arrivals));
        let ranked = lookup.arrivals_by_country(&code()).await.unwrap();
        assert_eq!(ranked.pairs(), vec![("France", 2), ("Germany", 1)]);
    }

    #[tokio::test]
    async fn test_aggregating_empty_schedule_is_no_data() {
        let lookup = Aggregating::new(StubSource::new(empty_schedule));
        let err = lookup.arrivals_by_country(&code()).await.unwrap_err();
        assert!(matches!(err, Error::NoDataFound(c) if c == code()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_second_call_skips_source() {
        let source = Arc::new(StubSource::new(three_arrivals));
        let cache = Arc::new(ArrivalsCache::new(Duration::from_secs(300), 100));
        let lookup = Cached::new(Aggregating::new(source.clone()), cache);

        let first = lookup.arrivals_by_country(&code()).await.unwrap();
        let second = lookup.arrivals_by_country(&code()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_refetches_after_ttl() {
        let source = Arc::new(StubSource::new(three_arrivals));
        let cache = Arc::new(ArrivalsCache::new(Duration::from_secs(300), 100));
        let lookup = Cached::new(Aggregating::new(source.clone()), cache);

        lookup.arrivals_by_country(&code()).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        lookup.arrivals_by_country(&code()).await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_cached_does_not_store_failures() {
        let source = Arc::new(StubSource::new(timed_out));
        let cache = Arc::new(ArrivalsCache::new(Duration::from_secs(300), 100));
        let lookup = Cached::new(Aggregating::new(source.clone()), cache.clone());

        for _ in 0..2 {
            let err = lookup.arrivals_by_country(&code()).await.unwrap_err();
            assert!(matches!(err, Error::Timeout(_)));
        }
        assert_eq!(source.calls(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cached_does_not_store_no_data() {
        let source = Arc::new(StubSource::new(empty_schedule));
        let cache = Arc::new(ArrivalsCache::new(Duration::from_secs(300), 100));
        let lookup = Cached::new(Aggregating::new(source.clone()), cache.clone());

        assert!(lookup.arrivals_by_country(&code()).await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cached_keys_by_canonical_code() {
        let source = Arc::new(StubSource::new(three_arrivals));
        let cache = Arc::new(ArrivalsCache::new(Duration::from_secs(300), 100));
        let lookup = Cached::new(Aggregating::new(source.clone()), cache);

        lookup
            .arrivals_by_country(&AirportCode::parse("lhr").unwrap())
            .await
            .unwrap();
        lookup
            .arrivals_by_country(&AirportCode::parse("LHR").unwrap())
            .await
            .unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_minimal_and_cached_agree() {
        let minimal = Aggregating::new(StubSource::new(three_arrivals));
        let hardened = Cached::new(
            Aggregating::new(StubSource::new(three_arrivals)),
            Arc::new(ArrivalsCache::new(Duration::from_secs(300), 100)),
        );

        assert_eq!(
            minimal.arrivals_by_country(&code()).await.unwrap(),
            hardened.arrivals_by_country(&code()).await.unwrap()
        );
    }
}
