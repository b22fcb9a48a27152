//! Validated Shopify shop domains.
//!
//! A shop domain is the store's permanent `*.myshopify.com` host. Input from
//! settings forms is often pasted as a full URL, so parsing strips an
//! `http://`/`https://` prefix and trailing slashes before validating.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

static SHOP_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9][a-z0-9-]*\.myshopify\.com$").expect("shop domain pattern is valid")
});

/// Error returned when a shop domain fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid Shopify store URL: {0:?} (expected something like \"your-store.myshopify.com\")")]
pub struct ShopDomainError(pub String);

/// A validated `<subdomain>.myshopify.com` domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Parse and validate a shop domain.
    ///
    /// Leading/trailing whitespace, an `http(s)://` scheme and trailing slashes
    /// are removed. The remainder must match
    /// `^[a-z0-9][a-z0-9-]*\.myshopify\.com$` exactly.
    ///
    /// # Errors
    ///
    /// Returns `ShopDomainError` if the input does not name a `myshopify.com` store.
    pub fn parse(input: &str) -> Result<Self, ShopDomainError> {
        let trimmed = input.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let host = without_scheme.trim_end_matches('/');

        if SHOP_DOMAIN_RE.is_match(host) {
            Ok(Self(host.to_string()))
        } else {
            Err(ShopDomainError(input.to_string()))
        }
    }

    /// The domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The store's public base URL (`https://{domain}`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}", self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for ShopDomain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_domain() {
        let shop = ShopDomain::parse("my-store.myshopify.com").unwrap();
        assert_eq!(shop.as_str(), "my-store.myshopify.com");
        assert_eq!(shop.base_url(), "https://my-store.myshopify.com");
    }

    #[test]
    fn test_strips_scheme_and_trailing_slash() {
        let shop = ShopDomain::parse("  https://store42.myshopify.com/ ").unwrap();
        assert_eq!(shop.to_string(), "store42.myshopify.com");

        let shop = ShopDomain::parse("http://store42.myshopify.com//").unwrap();
        assert_eq!(shop.as_str(), "store42.myshopify.com");
    }

    #[test]
    fn test_rejects_other_hosts() {
        for input in [
            "",
            "example.com",
            "store.myshopify.com.evil.com",
            "evil.com/store.myshopify.com",
            "-store.myshopify.com",
            "store_name.myshopify.com",
            "sub.store.myshopify.com",
            "store.myshopify.com/admin",
            "My-Store.myshopify.com",
            "myshopify.com",
        ] {
            assert!(ShopDomain::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<ShopDomain, _> = serde_json::from_str("\"a1.myshopify.com\"");
        assert!(ok.is_ok());

        let bad: Result<ShopDomain, _> = serde_json::from_str("\"shop.example.com\"");
        assert!(bad.is_err());
    }
}
