//! OAuth connection lifecycle.
//!
//! 1. [`OAuthFlow::initiate`] stores the app credentials and a one-time
//!    state, and returns Shopify's authorization URL.
//! 2. Shopify redirects back to `/oauth/callback`; [`OAuthFlow::handle_callback`]
//!    consumes the state, exchanges the code and stores the access token.
//! 3. The newest supported API version is detected and stored.
//!
//! The outcome is left as a one-shot [`Flash`] for the settings page.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use products_showcase_core::{ApiVersion, ShopDomain};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, instrument, warn};

use super::ShopifyError;
use super::client::{AdminClient, VERSION_DETECTION_TIMEOUT};
use super::queries::{self, PublicApiVersionsData};
use crate::cache::{FLASH_PREFIX, OAUTH_STATE_PREFIX, SHOPIFY_PREFIX, TransientCache};
use crate::db::Settings;

const STATE_TTL: Duration = Duration::from_secs(10 * 60);
const FLASH_TTL: Duration = Duration::from_secs(60);
const NONCE_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Types
// =============================================================================

/// A pending authorization, keyed by its nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub nonce: String,
    pub shop_domain: ShopDomain,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters Shopify sends to the redirect URI.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams(BTreeMap<String, String>);

impl CallbackParams {
    #[must_use]
    pub const fn new(params: BTreeMap<String, String>) -> Self {
        Self(params)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl From<BTreeMap<String, String>> for CallbackParams {
    fn from(params: BTreeMap<String, String>) -> Self {
        Self(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot notice shown on the next settings page view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

// =============================================================================
// HMAC Verification
// =============================================================================

/// Verify the `hmac` Shopify attaches to the callback.
///
/// The signed message is every other parameter except `signature`, sorted
/// by name and joined as `name=value&...`.
#[must_use]
pub fn verify_callback_hmac(params: &BTreeMap<String, String>, client_secret: &SecretString) -> bool {
    let Some(provided) = params.get("hmac").and_then(|hmac| hex::decode(hmac).ok()) else {
        return false;
    };

    let message = params
        .iter()
        .filter(|(name, _)| !matches!(name.as_str(), "hmac" | "signature"))
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(client_secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());

    // Constant-time comparison
    mac.verify_slice(&provided).is_ok()
}

// =============================================================================
// Flow
// =============================================================================

/// Drives connect, callback, version detection and disconnect.
#[derive(Clone)]
pub struct OAuthFlow {
    inner: Arc<OAuthFlowInner>,
}

struct OAuthFlowInner {
    client: AdminClient,
    settings: Settings,
    cache: TransientCache,
    redirect_uri: String,
}

impl OAuthFlow {
    #[must_use]
    pub fn new(
        client: AdminClient,
        settings: Settings,
        cache: TransientCache,
        redirect_uri: String,
    ) -> Self {
        Self {
            inner: Arc::new(OAuthFlowInner {
                client,
                settings,
                cache,
                redirect_uri,
            }),
        }
    }

    /// Start the authorization flow and return the URL to send the merchant to.
    ///
    /// # Errors
    ///
    /// - `ShopifyError::MissingCredentials` if any input is blank
    /// - `ShopifyError::InvalidShopUrl` if the shop is not a `myshopify.com` domain
    /// - `ShopifyError::Settings` if the credentials cannot be stored
    #[instrument(skip(self, client_secret))]
    pub async fn initiate(
        &self,
        shop_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, ShopifyError> {
        let (shop_url, client_id, client_secret) =
            (shop_url.trim(), client_id.trim(), client_secret.trim());
        if shop_url.is_empty() || client_id.is_empty() || client_secret.is_empty() {
            return Err(ShopifyError::MissingCredentials);
        }

        let shop = ShopDomain::parse(shop_url)?;
        let previous = self.inner.settings.shop_domain().await?;
        if previous.as_ref().is_some_and(|previous| *previous != shop) {
            // A token is only valid for the shop that granted it.
            self.inner.settings.forget_access_token().await?;
            info!(shop = %shop, "Shop changed; dropped the previous access token");
        }
        self.inner
            .settings
            .save_app_credentials(&shop, client_id, &SecretString::from(client_secret.to_string()))
            .await?;

        let nonce: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect();

        let state = OAuthState {
            nonce: nonce.clone(),
            shop_domain: shop.clone(),
            client_id: client_id.to_string(),
            created_at: Utc::now(),
        };
        self.inner
            .cache
            .set(format!("{OAUTH_STATE_PREFIX}{nonce}"), &state, STATE_TTL)
            .await;

        info!(shop = %shop, "OAuth flow initiated");
        Ok(self
            .inner
            .client
            .authorization_url(&shop, client_id, &self.inner.redirect_uri, &nonce))
    }

    /// Complete the flow from Shopify's redirect.
    ///
    /// # Errors
    ///
    /// - `ShopifyError::OAuth` if Shopify reported an error, the code is
    ///   missing, or the exchange was rejected
    /// - `ShopifyError::InvalidState` if the state is unknown, expired or used
    /// - `ShopifyError::InvalidHmac` if a supplied `hmac` does not verify
    /// - `ShopifyError::MissingCredentials` if the app credentials were removed
    ///   in the meantime
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, params: &CallbackParams) -> Result<(), ShopifyError> {
        if let Some(error) = params.get("error") {
            let message = params.get("error_description").unwrap_or(error);
            warn!(error, "Shopify reported an OAuth error");
            return Err(ShopifyError::OAuth(message.to_string()));
        }

        let nonce = params.get("state").ok_or(ShopifyError::InvalidState)?;
        let state: OAuthState = self
            .inner
            .cache
            .take(&format!("{OAUTH_STATE_PREFIX}{nonce}"))
            .await
            .ok_or(ShopifyError::InvalidState)?;

        let code = params
            .get("code")
            .ok_or_else(|| ShopifyError::OAuth("No authorization code received.".to_string()))?;

        let credentials = self
            .inner
            .settings
            .app_credentials()
            .await?
            .ok_or(ShopifyError::MissingCredentials)?;

        if params.get("hmac").is_some()
            && !verify_callback_hmac(&params.0, &credentials.client_secret)
        {
            warn!("Invalid HMAC signature in OAuth callback");
            return Err(ShopifyError::InvalidHmac);
        }

        let grant = self
            .inner
            .client
            .exchange_code(
                &state.shop_domain,
                &credentials.client_id,
                &credentials.client_secret,
                code,
            )
            .await?;

        self.inner
            .settings
            .save_access_token(&grant.access_token)
            .await?;
        info!(shop = %state.shop_domain, scope = %grant.scope, "Connected to Shopify store");

        if self
            .detect_api_version(&state.shop_domain, &grant.access_token)
            .await?
            .is_none()
        {
            warn!("API version detection failed; keeping the current version");
        }

        self.inner.cache.clear(SHOPIFY_PREFIX).await;
        Ok(())
    }

    /// Detect and store the newest supported stable API version.
    ///
    /// Tries the GraphQL `publicApiVersions` field first (queried at the
    /// fallback version), then the REST `/admin/api.json` listing. Returns
    /// `Ok(None)` when neither yields a version.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Settings` only if the detected version cannot be
    /// stored; detection failures are logged.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn detect_api_version(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Option<ApiVersion>, ShopifyError> {
        let Some(version) = self.query_api_version(shop, access_token).await else {
            return Ok(None);
        };

        self.inner.settings.save_api_version(&version).await?;
        info!(version = %version, "API version detected");
        Ok(Some(version))
    }

    async fn query_api_version(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Option<ApiVersion> {
        let fallback = self.inner.settings.fallback_api_version();

        match self
            .inner
            .client
            .execute_at::<PublicApiVersionsData>(
                shop,
                access_token,
                fallback,
                &queries::public_api_versions(),
                VERSION_DETECTION_TIMEOUT,
            )
            .await
        {
            Ok(data) => {
                let latest = ApiVersion::latest_supported(
                    data.public_api_versions
                        .iter()
                        .map(|entry| (entry.handle.as_str(), entry.supported)),
                );
                if latest.is_some() {
                    return latest;
                }
            }
            Err(e) => warn!(error = %e, "GraphQL version detection failed"),
        }

        match self.inner.client.rest_api_versions(shop, access_token).await {
            Ok(rest) => rest
                .supported_api_versions
                .iter()
                .filter(|entry| entry.latest_supported)
                .find_map(|entry| ApiVersion::parse(&entry.handle).ok())
                .or_else(|| {
                    ApiVersion::latest_supported(
                        rest.supported_api_versions
                            .iter()
                            .map(|entry| (entry.handle.as_str(), entry.supported)),
                    )
                }),
            Err(e) => {
                warn!(error = %e, "REST version detection failed");
                None
            }
        }
    }

    /// Re-run version detection with the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::MissingCredentials` when not connected.
    pub async fn refresh_api_version(&self) -> Result<Option<ApiVersion>, ShopifyError> {
        let credentials = self
            .inner
            .settings
            .api_credentials()
            .await?
            .ok_or(ShopifyError::MissingCredentials)?;
        self.detect_api_version(&credentials.shop, &credentials.access_token)
            .await
    }

    /// Forget the connection (shop domain is kept) and drop cached API data.
    ///
    /// Returns the number of cache entries removed.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Settings` if the settings cannot be updated.
    pub async fn disconnect(&self) -> Result<usize, ShopifyError> {
        self.inner.settings.disconnect().await?;
        let cleared = self.inner.cache.clear(SHOPIFY_PREFIX).await;
        info!(cleared, "Disconnected from Shopify");
        Ok(cleared)
    }

    // =========================================================================
    // Flash notices
    // =========================================================================

    pub async fn set_flash(&self, flash: &Flash) {
        self.inner
            .cache
            .set(format!("{FLASH_PREFIX}settings"), flash, FLASH_TTL)
            .await;
    }

    /// Read and clear the pending notice.
    pub async fn take_flash(&self) -> Option<Flash> {
        self.inner
            .cache
            .take(&format!("{FLASH_PREFIX}settings"))
            .await
    }
}
