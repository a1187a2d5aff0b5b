//! Application state management
//!
//! `AppState` is the composition root: it owns the lookup pipeline, the cache
//! behind it and the per-client limiter, and hands them to handlers by `Arc`.

use std::sync::Arc;

use crate::{
    cache::{ArrivalsCache, CacheStats},
    config::Config,
    error::Result,
    middleware::rate_limit::ClientRateLimiter,
    pipeline::{Aggregating, ArrivalsLookup, Cached, FlightApiClient, ScheduleSource},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    lookup: Arc<dyn ArrivalsLookup>,
    cache: Option<Arc<ArrivalsCache>>,
    limiter: Option<ClientRateLimiter>,
}

impl AppState {
    /// Build the state for `config`, talking to the configured schedule provider
    pub fn new(config: Config) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The lookup pipeline handlers should call
    pub fn lookup(&self) -> &Arc<dyn ArrivalsLookup> {
        &self.lookup
    }

    /// The result cache, when caching is enabled
    pub fn cache(&self) -> Option<&Arc<ArrivalsCache>> {
        self.cache.as_ref()
    }

    /// The per-client limiter, when rate limiting is enabled
    pub fn limiter(&self) -> Option<&ClientRateLimiter> {
        self.limiter.as_ref()
    }

    /// Cache sizing for health reporting; a disabled cache reports as empty
    pub async fn cache_stats(&self) -> CacheStats {
        match &self.cache {
            Some(cache) => cache.stats().await,
            None => CacheStats {
                current_size: 0,
                max_size: self.config.cache.max_size,
                ttl: self.config.cache.ttl(),
            },
        }
    }
}

/// Builder for AppState
///
/// Without an explicit source the builder creates a [`FlightApiClient`] from
/// the `flight_api` section of the configuration.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    source: Option<Arc<dyn ScheduleSource>>,
}

impl AppStateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `source` instead of the HTTP client
    pub fn source(mut self, source: Arc<dyn ScheduleSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Assemble the pipeline and limiter
    pub fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let source: Arc<dyn ScheduleSource> = match self.source {
            Some(source) => source,
            None => Arc::new(FlightApiClient::new(&config.flight_api)?),
        };
        let core = Aggregating::new(source);

        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ArrivalsCache::from_config(&config.cache)));
        let lookup: Arc<dyn ArrivalsLookup> = match &cache {
            Some(cache) => Arc::new(Cached::new(core, cache.clone())),
            None => Arc::new(core),
        };

        let limiter = if config.rate_limit.enabled {
            Some(ClientRateLimiter::new(config.rate_limit.rule()?)?)
        } else {
            None
        };

        tracing::info!(
            cache = config.cache.enabled,
            cache_ttl_secs = config.cache.ttl_secs,
            cache_max_size = config.cache.max_size,
            rate_limit = if config.rate_limit.enabled { config.rate_limit.limit.as_str() } else { "disabled" },
            max_attempts = config.flight_api.max_attempts,
            "Lookup pipeline assembled"
        );

        Ok(AppState {
            config: Arc::new(config),
            lookup,
            cache,
            limiter,
        })
    }
}
