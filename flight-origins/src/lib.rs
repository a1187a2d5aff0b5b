//! # flight-origins
//!
//! A small web service that ranks an airport's upcoming arrivals by the
//! country each flight departs from.
//!
//! A submitted three-letter code is validated, the provider's arrivals
//! schedule is fetched, every arrival's origin country is pulled out of the
//! payload, and the countries are ranked by flight count. Results are cached
//! for a few minutes and each client IP is rate limited.
//!
//! ## Example
//!
//! ```rust,no_run
//! use flight_origins::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::new(config.clone())?;
//!     Server::new(config).serve(state).await
//! }
//! ```

pub mod airport;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod templates;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::airport::AirportCode;
    pub use crate::cache::{ArrivalsCache, CacheStats};
    pub use crate::config::{CacheConfig, Config, FlightApiConfig, RateLimitConfig};
    pub use crate::error::{Error, ErrorResponse, Result};
    pub use crate::handlers::router;
    pub use crate::health::{health, HealthResponse};
    pub use crate::middleware::{ClientRateLimiter, RateLimitRule};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{
        Aggregating, ArrivalsLookup, Cached, CountryArrivals, FlightApiClient, RankedResult,
        ScheduleSource,
    };
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};
}
