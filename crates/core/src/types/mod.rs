//! Core types for Products Showcase.
//!
//! This module provides type-safe wrappers for common Shopify concepts.

pub mod api_version;
pub mod gid;
pub mod price;
pub mod shop_domain;

pub use api_version::{ApiVersion, ApiVersionError, FALLBACK_API_VERSION};
pub use gid::{GidError, GidKind, ShopifyGid};
pub use price::{Price, PriceError, currency_symbol};
pub use shop_domain::{ShopDomain, ShopDomainError};
