//! The aggregation pipeline
//!
//! Raw schedule payloads come in through a [`ScheduleSource`], are reduced to
//! origin-country names by [`normalize`], and are counted and ranked by
//! [`aggregate`]. [`lookup`] composes those steps and the optional cache layer.

pub mod aggregate;
pub mod fetch;
pub mod lookup;
pub mod normalize;

pub use aggregate::{rank, CountryArrivals, CountryCount, RankedResult};
pub use fetch::{FlightApiClient, ScheduleSource};
pub use lookup::{Aggregating, ArrivalsLookup, Cached};
pub use normalize::{country_names, walk};
