//! Admin settings UI.
//!
//! Server-rendered pages for connecting the store, choosing the cache
//! duration and UTM parameters, and clearing the cache. Actions redirect back
//! to the settings page with a one-shot notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::cache::SHOPIFY_PREFIX;
use crate::db::{CACHE_DURATION_CHOICES, RepositoryError, UtmParams};
use crate::error::Result;
use crate::middleware::{Capability, RequireAdmin, clear_token_cookie, token_cookie};
use crate::shopify::{Flash, FlashKind, ShopifyError};
use crate::state::AppState;

/// Example product URL shown next to the UTM fields.
const UTM_EXAMPLE_PATH: &str = "/products/example-product";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "settings/login.html")]
pub struct LoginTemplate {
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheChoice {
    pub secs: u64,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "settings/index.html")]
pub struct SettingsTemplate {
    pub success_message: Option<String>,
    pub error_message: Option<String>,
    pub shop_domain: String,
    pub client_id: String,
    pub has_client_secret: bool,
    pub connected: bool,
    pub shop_name: Option<String>,
    pub connection_error: Option<String>,
    pub api_version: String,
    pub api_version_detected: bool,
    pub redirect_uri: String,
    pub cache_choices: Vec<CacheChoice>,
    pub cached_items: usize,
    pub utm: UtmParams,
    pub utm_example: Option<String>,
}

/// Build the `/admin` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/settings", get(settings_page).post(save_settings))
        .route("/settings/connect", post(connect))
        .route("/settings/disconnect", post(disconnect))
        .route("/settings/refresh-api-version", post(refresh_api_version))
        .route("/settings/clear-cache", post(clear_cache))
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub cache_duration: u64,
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_medium: String,
    #[serde(default)]
    pub utm_campaign: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectForm {
    #[serde(default)]
    pub shop_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

// =============================================================================
// Login
// =============================================================================

/// GET /admin/login
async fn login_page() -> LoginTemplate {
    LoginTemplate {
        error_message: None,
    }
}

/// POST /admin/login
#[instrument(skip_all)]
async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let rejected = |message: &str| {
        LoginTemplate {
            error_message: Some(message.to_string()),
        }
        .into_response()
    };

    match Capability::for_token(&state, form.token.trim()) {
        Some(Capability::Admin) => {}
        Some(Capability::Editor) => {
            return rejected("This token does not grant access to settings.");
        }
        None => return rejected("Invalid token."),
    }

    let secure = state.config().base_url.starts_with("https://");
    let Some(cookie) = token_cookie(form.token.trim(), secure) else {
        return rejected("Invalid token.");
    };
    info!("Admin signed in");
    ([(SET_COOKIE, cookie)], Redirect::to("/admin/settings")).into_response()
}

/// POST /admin/logout
async fn logout() -> Response {
    (
        [(SET_COOKIE, clear_token_cookie())],
        Redirect::to("/admin/login"),
    )
        .into_response()
}

// =============================================================================
// Settings Page
// =============================================================================

/// GET /admin/settings
#[instrument(skip(state))]
async fn settings_page(State(state): State<AppState>, _auth: RequireAdmin) -> Result<SettingsTemplate> {
    let snapshot = state.settings().snapshot().await?;

    let (success_message, error_message) = match state.oauth().take_flash().await {
        Some(Flash {
            kind: FlashKind::Success,
            message,
        }) => (Some(message), None),
        Some(Flash {
            kind: FlashKind::Error,
            message,
        }) => (None, Some(message)),
        None => (None, None),
    };

    let (shop_name, connection_error) = if snapshot.connected {
        match state.catalog().shop_name().await {
            Ok(name) => (Some(name), None),
            Err(e) => {
                warn!(error = %e, "Connection check failed");
                (None, Some(e.to_string()))
            }
        }
    } else {
        (None, None)
    };

    let cache_choices = CACHE_DURATION_CHOICES
        .iter()
        .map(|&(secs, label)| CacheChoice {
            secs,
            label,
            selected: secs == snapshot.cache_duration_secs,
        })
        .collect();

    let utm_example = snapshot.shop_domain.as_ref().map(|shop| {
        let query = snapshot.utm.query_string();
        let base = format!("https://{shop}{UTM_EXAMPLE_PATH}");
        if query.is_empty() {
            base
        } else {
            format!("{base}?{query}")
        }
    });

    Ok(SettingsTemplate {
        success_message,
        error_message,
        shop_domain: snapshot.shop_domain.unwrap_or_default(),
        client_id: snapshot.client_id.unwrap_or_default(),
        has_client_secret: snapshot.has_client_secret,
        connected: snapshot.connected,
        shop_name,
        connection_error,
        api_version: snapshot.api_version,
        api_version_detected: snapshot.api_version_detected,
        redirect_uri: state.config().redirect_uri(),
        cache_choices,
        cached_items: state.cache().count(SHOPIFY_PREFIX).await,
        utm: snapshot.utm,
        utm_example,
    })
}

/// POST /admin/settings
#[instrument(skip(state))]
async fn save_settings(
    State(state): State<AppState>,
    _auth: RequireAdmin,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect> {
    let flash = match state.settings().set_cache_duration(form.cache_duration).await {
        Ok(()) => {
            state
                .settings()
                .save_utm(&UtmParams::new(
                    &form.utm_source,
                    &form.utm_medium,
                    &form.utm_campaign,
                ))
                .await?;
            Flash::success("Settings saved successfully!")
        }
        Err(RepositoryError::InvalidValue(message)) => Flash::error(message),
        Err(e) => return Err(e.into()),
    };

    state.oauth().set_flash(&flash).await;
    Ok(Redirect::to("/admin/settings"))
}

// =============================================================================
// Actions
// =============================================================================

/// POST /admin/settings/connect
///
/// Redirects to Shopify's authorization page on success.
#[instrument(skip_all)]
async fn connect(
    State(state): State<AppState>,
    _auth: RequireAdmin,
    Form(form): Form<ConnectForm>,
) -> Result<Redirect> {
    match state
        .oauth()
        .initiate(&form.shop_url, &form.client_id, &form.client_secret)
        .await
    {
        Ok(authorization_url) => Ok(Redirect::to(&authorization_url)),
        Err(ShopifyError::Settings(e)) => Err(e.into()),
        Err(e) => {
            state.oauth().set_flash(&Flash::error(e.to_string())).await;
            Ok(Redirect::to("/admin/settings"))
        }
    }
}

/// POST /admin/settings/disconnect
#[instrument(skip(state))]
async fn disconnect(State(state): State<AppState>, _auth: RequireAdmin) -> Result<Redirect> {
    state.oauth().disconnect().await?;
    state
        .oauth()
        .set_flash(&Flash::success("Disconnected from Shopify."))
        .await;
    Ok(Redirect::to("/admin/settings"))
}

/// POST /admin/settings/refresh-api-version
#[instrument(skip(state))]
async fn refresh_api_version(State(state): State<AppState>, _auth: RequireAdmin) -> Redirect {
    let flash = match state.oauth().refresh_api_version().await {
        Ok(Some(version)) => Flash::success(format!("API version updated to {version}.")),
        Ok(None) => Flash::error("Could not detect the API version. Keeping the current one."),
        Err(e) => {
            error!(error = %e, "API version refresh failed");
            Flash::error(e.to_string())
        }
    };
    state.oauth().set_flash(&flash).await;
    Redirect::to("/admin/settings")
}

/// POST /admin/settings/clear-cache
#[instrument(skip(state))]
async fn clear_cache(State(state): State<AppState>, _auth: RequireAdmin) -> Redirect {
    let removed = state.cache().clear(SHOPIFY_PREFIX).await;
    info!(removed, "Cache cleared");
    state
        .oauth()
        .set_flash(&Flash::success("Cache cleared successfully!"))
        .await;
    Redirect::to("/admin/settings")
}
