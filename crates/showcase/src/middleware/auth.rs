//! Capability extractors.
//!
//! Callers authenticate with `Authorization: Bearer <token>` or the
//! `showcase_token` cookie set by `/admin/login`. The admin token grants both
//! capabilities; the editor token grants editor capability only.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::state::AppState;

/// Cookie carrying the token for the settings UI.
pub const TOKEN_COOKIE: &str = "showcase_token";

/// What a presented token allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Admin,
    Editor,
}

impl Capability {
    /// Resolve a presented token against the configured ones.
    #[must_use]
    pub fn for_token(state: &AppState, token: &str) -> Option<Self> {
        let config = state.config();
        if token_matches(token, &config.admin_token) {
            Some(Self::Admin)
        } else if token_matches(token, &config.editor_token) {
            Some(Self::Editor)
        } else {
            None
        }
    }
}

// Digests are compared so the comparison time does not depend on the token.
fn token_matches(presented: &str, expected: &SecretString) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.expose_secret().as_bytes())
}

/// Token from the bearer header, else from the cookie.
fn presented_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value storing `token` for the settings UI.
#[must_use]
pub fn token_cookie(token: &str, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict{secure}"
    ))
    .ok()
}

/// `Set-Cookie` value removing the token cookie.
#[must_use]
pub fn clear_token_cookie() -> HeaderValue {
    HeaderValue::from_static("showcase_token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// Rejection for capability extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Settings UI request without a valid token.
    RedirectToLogin,
    /// API request without a valid token.
    Unauthorized,
    /// Valid token lacking the required capability.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/admin/login").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({ "error": true, "message": "Authentication required" })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                axum::Json(json!({ "error": true, "message": "Admin capability required" })),
            )
                .into_response(),
        }
    }
}

fn capability(parts: &Parts, state: &AppState) -> Result<Capability, AuthRejection> {
    presented_token(&parts.headers)
        .and_then(|token| Capability::for_token(state, &token))
        .ok_or_else(|| {
            // Nested routers see the path without their prefix.
            let uri = parts
                .extensions
                .get::<OriginalUri>()
                .map_or(&parts.uri, |original| &original.0);
            if uri.path().starts_with("/admin/") {
                AuthRejection::RedirectToLogin
            } else {
                AuthRejection::Unauthorized
            }
        })
}

/// Extractor that requires editor (or admin) capability.
#[derive(Debug, Clone, Copy)]
pub struct RequireEditor(pub Capability);

impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        capability(parts, state).map(Self)
    }
}

/// Extractor that requires admin capability.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match capability(parts, state)? {
            Capability::Admin => Ok(Self),
            Capability::Editor => Err(AuthRejection::Forbidden),
        }
    }
}
