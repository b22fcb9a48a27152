//! HTTP middleware.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID
//! 4. Path normalization (trailing slash)
//!
//! Capability checks are extractors ([`RequireEditor`], [`RequireAdmin`])
//! rather than layers.

pub mod auth;
pub mod request_id;

pub use auth::{
    AuthRejection, Capability, RequireAdmin, RequireEditor, TOKEN_COOKIE, clear_token_cookie,
    token_cookie,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
