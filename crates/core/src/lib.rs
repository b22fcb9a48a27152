//! Products Showcase Core - Shared types library.
//!
//! This crate provides common types used across all Products Showcase components:
//! - `showcase` - HTTP service (settings, OAuth, catalog, block rendering)
//! - `cli` - Command-line tools for migrations and settings management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated wrappers for shop domains, Shopify GIDs, API versions and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
