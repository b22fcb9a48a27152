//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Settings store reachable
//! POST /blocks/render                  - Block HTML for public pages
//! GET  /oauth/callback                 - Shopify OAuth redirect target
//!
//! # Editor capability
//! GET  /api/connection-status
//! GET  /api/search-products?query=
//! GET  /api/search-collections?query=
//! GET  /api/products/{id}
//! GET  /api/collections/{id}
//! POST /api/blocks/preview             - Block HTML with placeholder
//!
//! # Admin capability
//! POST /api/clear-cache
//! GET  /api/cache-status
//! POST /api/oauth/initiate
//! POST /api/oauth/disconnect
//! POST /api/oauth/refresh-api-version
//!
//! # Settings UI (admin capability)
//! GET  /admin/login   POST /admin/login   POST /admin/logout
//! GET  /admin/settings   POST /admin/settings
//! POST /admin/settings/connect | disconnect | refresh-api-version | clear-cache
//! ```

pub mod admin;
pub mod api;
pub mod blocks;
pub mod oauth;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tracing::warn;

use crate::state::AppState;

/// Create all routes for the service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(blocks::router())
        .merge(oauth::router())
        .nest("/api", api::router())
        .nest("/admin", admin::router())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the settings store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.settings().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Settings store unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
