//! Extraction of origin countries from the provider's schedule payload
//!
//! The payload is treated as an untyped JSON tree. Nothing here returns an
//! error: a record whose origin country cannot be resolved is skipped, and a
//! payload of the wrong shape simply yields nothing.

use serde_json::Value;

/// Path from an airport object to its list of arrival records
pub const ARRIVALS_PATH: &[&str] = &["airport", "pluginData", "schedule", "arrivals", "data"];

/// Path from an arrival record to its origin country name
pub const ORIGIN_COUNTRY_PATH: &[&str] =
    &["flight", "airport", "origin", "position", "country", "name"];

/// Follow `path` through nested objects.
///
/// Returns `None` at the first step where the current value is not an object
/// or does not contain the key.
pub fn walk<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.as_object()?.get(*key))
}

/// Origin country of a single arrival record, if it has a usable one
pub fn origin_country(record: &Value) -> Option<&str> {
    walk(record, ORIGIN_COUNTRY_PATH)?
        .as_str()
        .filter(|name| !name.is_empty())
}

/// Lazily yield one country name per resolvable arrival record.
///
/// Expects an array of airport objects; any other top-level value yields an
/// empty iterator.
pub fn country_names(payload: &Value) -> impl Iterator<Item = &str> {
    payload
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|airport| walk(airport, ARRIVALS_PATH)?.as_array())
        .flatten()
        .filter_map(origin_country)
}
