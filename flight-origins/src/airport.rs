//! Validated IATA airport codes

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A three-character airport identifier.
///
/// Codes are case-insensitive. The canonical form is uppercase, which is what
/// `Display` prints and what the cache is keyed by; the provider is queried
/// with the lowercase form. The only way to obtain one is through
/// [`AirportCode::parse`], so anything holding an `AirportCode` has already
/// passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AirportCode(String);

impl AirportCode {
    /// Number of characters in a valid code
    pub const LEN: usize = 3;

    /// Validate raw user input.
    ///
    /// Length is counted in characters, not bytes. No trimming is applied.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.chars().count() != Self::LEN {
            return Err(Error::InvalidInput(raw.to_string()));
        }
        Ok(Self(raw.to_uppercase()))
    }

    /// Canonical uppercase form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form sent in the provider's `iata` query parameter
    pub fn query_value(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AirportCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for AirportCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonicalizes_case() {
        let code = AirportCode::parse("lHr").unwrap();
        assert_eq!(code.as_str(), "LHR");
        assert_eq!(code.to_string(), "LHR");
        assert_eq!(code.query_value(), "lhr");
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(
            AirportCode::parse("cdg").unwrap(),
            "CDG".parse::<AirportCode>().unwrap()
        );
    }

    #[test]
    fn test_rejects_wrong_length() {
        for raw in ["", "L", "LH", "LHRX", "London", " LHR", "LHR "] {
            assert!(
                matches!(AirportCode::parse(raw), Err(Error::InvalidInput(ref s)) if s == raw),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // three characters, six bytes
        assert!(AirportCode::parse("ÅÄÖ").is_ok());
    }

    #[test]
    fn test_no_alphabetic_check() {
        assert_eq!(AirportCode::parse("1a2").unwrap().as_str(), "1A2");
    }
}
