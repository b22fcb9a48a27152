//! Shopify Admin API versions.
//!
//! Stable versions are named `YYYY-MM`, so lexicographic order is also
//! release order. The rolling `unstable` handle is never selected.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version used until a store's supported versions have been detected.
pub const FALLBACK_API_VERSION: &str = "2025-10";

/// Error returned for handles that are not `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid API version handle: {0:?}")]
pub struct ApiVersionError(pub String);

/// A stable `YYYY-MM` API version handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion(String);

impl ApiVersion {
    /// Parse a `YYYY-MM` handle.
    ///
    /// # Errors
    ///
    /// Returns `ApiVersionError` for anything else, including `unstable`.
    pub fn parse(handle: &str) -> Result<Self, ApiVersionError> {
        let bytes = handle.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes.iter().enumerate().all(|(i, b)| {
                if i == 4 {
                    *b == b'-'
                } else {
                    b.is_ascii_digit()
                }
            });

        if well_formed {
            Ok(Self(handle.to_string()))
        } else {
            Err(ApiVersionError(handle.to_string()))
        }
    }

    /// The fallback version.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_API_VERSION.to_string())
    }

    /// The handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this version is the same as or newer than `handle`.
    #[must_use]
    pub fn is_at_least(&self, handle: &str) -> bool {
        self.0.as_str() >= handle
    }

    /// Pick the newest supported stable handle.
    ///
    /// Entries are `(handle, supported)` pairs as reported by Shopify. Handles
    /// that are unsupported, `unstable`, or not `YYYY-MM` are skipped.
    pub fn latest_supported<'a, I>(versions: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        versions
            .into_iter()
            .filter(|(_, supported)| *supported)
            .filter_map(|(handle, _)| Self::parse(handle).ok())
            .max()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = ApiVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(ApiVersion::parse("2025-01").unwrap().as_str(), "2025-01");
        assert!(ApiVersion::parse("unstable").is_err());
        assert!(ApiVersion::parse("2025-1").is_err());
        assert!(ApiVersion::parse("2025_01").is_err());
        assert!(ApiVersion::parse("2025-01-01").is_err());
    }

    #[test]
    fn test_latest_supported_picks_greatest_supported_handle() {
        let versions = [
            ("2024-10", true),
            ("2025-07", true),
            ("2025-10", false),
            ("unstable", true),
            ("2025-04", true),
            ("release-candidate", true),
        ];
        let latest = ApiVersion::latest_supported(versions).unwrap();
        assert_eq!(latest.as_str(), "2025-07");
    }

    #[test]
    fn test_latest_supported_none_when_nothing_qualifies() {
        assert!(ApiVersion::latest_supported([("unstable", true), ("2025-01", false)]).is_none());
        assert!(ApiVersion::latest_supported(std::iter::empty()).is_none());
    }

    #[test]
    fn test_is_at_least() {
        let version = ApiVersion::parse("2024-07").unwrap();
        assert!(version.is_at_least("2024-04"));
        assert!(version.is_at_least("2024-07"));
        assert!(!version.is_at_least("2025-01"));
    }

    #[test]
    fn test_fallback_is_valid() {
        assert_eq!(ApiVersion::fallback().as_str(), FALLBACK_API_VERSION);
        assert!(ApiVersion::parse(FALLBACK_API_VERSION).is_ok());
    }
}
