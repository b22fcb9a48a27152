//! Shopify Admin API access.
//!
//! # Architecture
//!
//! - [`AdminClient`] - HTTP transport: GraphQL execution, OAuth code exchange,
//!   REST version listing
//! - [`Catalog`] - cached product/collection reads and editor searches
//! - [`OAuthFlow`] - connect/disconnect lifecycle and API version detection
//!
//! Credentials live in the settings store, not in configuration; every call
//! reads them so a reconnect takes effect immediately.

mod catalog;
mod client;
mod conversions;
mod oauth;
pub mod queries;
pub mod types;

pub use catalog::{COLLECTION_PRODUCTS_DEFAULT_LIMIT, Catalog};
pub use client::{AdminClient, TokenGrant};
pub use oauth::{CallbackParams, Flash, FlashKind, OAuthFlow, OAuthState, verify_callback_hmac};
pub use types::*;

use products_showcase_core::{GidError, ShopDomainError};
use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur when talking to Shopify.
///
/// None of these are retried.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// Shop domain, client credentials or access token are not stored.
    #[error("Shopify API credentials not configured")]
    MissingCredentials,

    /// Shop domain failed validation.
    #[error(transparent)]
    InvalidShopUrl(#[from] ShopDomainError),

    /// OAuth `state` was unknown, expired or already used.
    #[error("Invalid or expired OAuth state. Please try connecting again.")]
    InvalidState,

    /// Shopify rejected the authorization or the code exchange.
    #[error("{0}")]
    OAuth(String),

    /// OAuth callback signature did not verify.
    #[error("OAuth callback signature could not be verified")]
    InvalidHmac,

    /// Non-200 response.
    #[error("HTTP Error: {0}")]
    Http(u16),

    /// Network failure or timeout.
    #[error("Failed to connect to Shopify: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("Invalid JSON response from Shopify API")]
    InvalidJson,

    /// Top-level `errors` in a GraphQL response; `message` is the first one, verbatim.
    #[error("{message}")]
    GraphQL { message: String },

    /// Product or collection id could not be normalized.
    #[error(transparent)]
    InvalidId(#[from] GidError),

    /// Settings could not be read or written.
    #[error("settings storage error: {0}")]
    Settings(#[from] RepositoryError),
}

impl ShopifyError {
    /// Whether the error was caused by the caller's input rather than by
    /// Shopify or the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::InvalidShopUrl(_)
                | Self::InvalidState
                | Self::InvalidHmac
                | Self::InvalidId(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_is_verbatim() {
        let err = ShopifyError::GraphQL {
            message: "Field 'foo' doesn't exist on type 'Shop'".to_string(),
        };
        assert_eq!(err.to_string(), "Field 'foo' doesn't exist on type 'Shop'");
    }

    #[test]
    fn test_http_error_display() {
        assert_eq!(ShopifyError::Http(503).to_string(), "HTTP Error: 503");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ShopifyError::InvalidState.is_client_error());
        assert!(ShopifyError::MissingCredentials.is_client_error());
        assert!(!ShopifyError::Http(500).is_client_error());
        assert!(!ShopifyError::InvalidJson.is_client_error());
    }
}
