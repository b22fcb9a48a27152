//! Settings storage.
//!
//! Every setting is a scalar string stored under a fixed key. [`SettingsStore`]
//! is the storage seam (`PostgreSQL` or in-memory); [`Settings`] is the typed
//! facade the rest of the service uses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use products_showcase_core::{ApiVersion, ShopDomain};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::warn;

use super::RepositoryError;

/// Cache lifetime used when none is configured.
pub const DEFAULT_CACHE_DURATION_SECS: u64 = 3600;

/// Cache lifetimes offered on the settings page, in seconds.
pub const CACHE_DURATION_CHOICES: &[(u64, &str)] = &[
    (900, "15 minutes"),
    (1800, "30 minutes"),
    (3600, "1 hour"),
    (7200, "2 hours"),
    (21_600, "6 hours"),
    (43_200, "12 hours"),
    (86_400, "24 hours"),
];

// =============================================================================
// Keys
// =============================================================================

/// A stored setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ShopDomain,
    ClientId,
    ClientSecret,
    AccessToken,
    ApiVersion,
    CacheDuration,
    UtmSource,
    UtmMedium,
    UtmCampaign,
}

impl SettingKey {
    /// Every key, in display order.
    pub const ALL: [Self; 9] = [
        Self::ShopDomain,
        Self::ClientId,
        Self::ClientSecret,
        Self::AccessToken,
        Self::ApiVersion,
        Self::CacheDuration,
        Self::UtmSource,
        Self::UtmMedium,
        Self::UtmCampaign,
    ];

    /// Column value used in the settings table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShopDomain => "shop_domain",
            Self::ClientId => "client_id",
            Self::ClientSecret => "client_secret",
            Self::AccessToken => "access_token",
            Self::ApiVersion => "api_version",
            Self::CacheDuration => "cache_duration",
            Self::UtmSource => "utm_source",
            Self::UtmMedium => "utm_medium",
            Self::UtmCampaign => "utm_campaign",
        }
    }

    /// Whether the value must never be displayed.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::ClientSecret | Self::AccessToken)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Key/value storage backing [`Settings`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: SettingKey) -> Result<Option<String>, RepositoryError>;

    /// Insert or replace a value.
    async fn set(&self, key: SettingKey, value: &str) -> Result<(), RepositoryError>;

    /// Remove a value. Removing a missing key is not an error.
    async fn delete(&self, key: SettingKey) -> Result<(), RepositoryError>;

    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// `PostgreSQL`-backed settings (`showcase.settings`).
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<String>, RepositoryError> {
        let value = sqlx::query_scalar::<_, String>(
            r"
            SELECT value FROM showcase.settings
            WHERE key = $1
            ",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: SettingKey, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO showcase.settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: SettingKey) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM showcase.settings WHERE key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Process-local settings, used without a database and in tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<SettingKey, String>>,
}

impl MemorySettingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<String>, RepositoryError> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: SettingKey, value: &str) -> Result<(), RepositoryError> {
        self.values.write().await.insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: SettingKey) -> Result<(), RepositoryError> {
        self.values.write().await.remove(&key);
        Ok(())
    }
}

// =============================================================================
// Typed values
// =============================================================================

/// OAuth app credentials for the connected store.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct AppCredentials {
    pub shop: ShopDomain,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("shop", &self.shop)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything needed to call the Admin API.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ApiCredentials {
    pub shop: ShopDomain,
    pub access_token: SecretString,
    pub api_version: ApiVersion,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Campaign parameters appended to product links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
}

impl UtmParams {
    /// Build from raw form values; blank values are dropped.
    #[must_use]
    pub fn new(source: &str, medium: &str, campaign: &str) -> Self {
        Self {
            source: non_empty(source),
            medium: non_empty(medium),
            campaign: non_empty(campaign),
        }
    }

    /// Whether no parameter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.source.is_none() && self.medium.is_none() && self.campaign.is_none()
    }

    /// URL-encoded query string without a leading `?`; empty when nothing is set.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in [
            ("utm_source", &self.source),
            ("utm_medium", &self.medium),
            ("utm_campaign", &self.campaign),
        ] {
            if let Some(value) = value {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }
}

/// Display-safe view of the stored settings.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsSnapshot {
    pub shop_domain: Option<String>,
    pub client_id: Option<String>,
    pub has_client_secret: bool,
    pub connected: bool,
    pub api_version: String,
    pub api_version_detected: bool,
    pub cache_duration_secs: u64,
    pub utm: UtmParams,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// =============================================================================
// Facade
// =============================================================================

/// Typed access to stored settings.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
    fallback_version: ApiVersion,
}

impl Settings {
    /// Wrap a store. `fallback_version` is reported until a version is detected.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, fallback_version: ApiVersion) -> Self {
        Self {
            store,
            fallback_version,
        }
    }

    /// Check that the backing store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.store.ping().await
    }

    async fn get_value(&self, key: SettingKey) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|value| non_empty(&value)))
    }

    async fn set_or_delete(&self, key: SettingKey, value: Option<&str>) -> Result<(), RepositoryError> {
        match value.and_then(non_empty) {
            Some(value) => self.store.set(key, &value).await,
            None => self.store.delete(key).await,
        }
    }

    /// The stored shop domain, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn shop_domain(&self) -> Result<Option<ShopDomain>, RepositoryError> {
        let Some(raw) = self.get_value(SettingKey::ShopDomain).await? else {
            return Ok(None);
        };
        match ShopDomain::parse(&raw) {
            Ok(shop) => Ok(Some(shop)),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid stored shop domain");
                Ok(None)
            }
        }
    }

    /// Shop domain plus OAuth client id and secret, when all are stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn app_credentials(&self) -> Result<Option<AppCredentials>, RepositoryError> {
        let shop = self.shop_domain().await?;
        let client_id = self.get_value(SettingKey::ClientId).await?;
        let client_secret = self.get_value(SettingKey::ClientSecret).await?;

        Ok(match (shop, client_id, client_secret) {
            (Some(shop), Some(client_id), Some(client_secret)) => Some(AppCredentials {
                shop,
                client_id,
                client_secret: SecretString::from(client_secret),
            }),
            _ => None,
        })
    }

    /// Shop domain, access token and API version, when connected.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn api_credentials(&self) -> Result<Option<ApiCredentials>, RepositoryError> {
        let Some(shop) = self.shop_domain().await? else {
            return Ok(None);
        };
        let Some(access_token) = self.get_value(SettingKey::AccessToken).await? else {
            return Ok(None);
        };

        Ok(Some(ApiCredentials {
            shop,
            access_token: SecretString::from(access_token),
            api_version: self.api_version().await?,
        }))
    }

    /// Persist the shop domain and OAuth app credentials.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn save_app_credentials(
        &self,
        shop: &ShopDomain,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<(), RepositoryError> {
        self.store.set(SettingKey::ShopDomain, shop.as_str()).await?;
        self.store.set(SettingKey::ClientId, client_id.trim()).await?;
        self.store
            .set(SettingKey::ClientSecret, client_secret.expose_secret().trim())
            .await
    }

    /// Persist the access token obtained from a code exchange.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn save_access_token(&self, token: &SecretString) -> Result<(), RepositoryError> {
        self.store
            .set(SettingKey::AccessToken, token.expose_secret())
            .await
    }

    /// Drop the access token and detected version, keeping app credentials.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn forget_access_token(&self) -> Result<(), RepositoryError> {
        self.store.delete(SettingKey::AccessToken).await?;
        self.store.delete(SettingKey::ApiVersion).await
    }

    /// The detected API version, if one is stored and valid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn detected_api_version(&self) -> Result<Option<ApiVersion>, RepositoryError> {
        Ok(self
            .get_value(SettingKey::ApiVersion)
            .await?
            .and_then(|raw| ApiVersion::parse(&raw).ok()))
    }

    /// The detected API version, or the fallback.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn api_version(&self) -> Result<ApiVersion, RepositoryError> {
        Ok(self
            .detected_api_version()
            .await?
            .unwrap_or_else(|| self.fallback_version.clone()))
    }

    /// The version used before detection.
    #[must_use]
    pub const fn fallback_api_version(&self) -> &ApiVersion {
        &self.fallback_version
    }

    /// Persist a detected API version.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn save_api_version(&self, version: &ApiVersion) -> Result<(), RepositoryError> {
        self.store.set(SettingKey::ApiVersion, version.as_str()).await
    }

    /// Lifetime of cached Shopify responses. Missing, zero or unreadable
    /// values mean [`DEFAULT_CACHE_DURATION_SECS`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn cache_duration(&self) -> Result<Duration, RepositoryError> {
        let secs = self
            .get_value(SettingKey::CacheDuration)
            .await?
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CACHE_DURATION_SECS);
        Ok(Duration::from_secs(secs))
    }

    /// Persist the cache lifetime.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidValue` unless `secs` is one of
    /// [`CACHE_DURATION_CHOICES`].
    pub async fn set_cache_duration(&self, secs: u64) -> Result<(), RepositoryError> {
        if !CACHE_DURATION_CHOICES.iter().any(|(choice, _)| *choice == secs) {
            return Err(RepositoryError::InvalidValue(format!(
                "cache duration {secs}s is not one of the offered choices"
            )));
        }
        self.store
            .set(SettingKey::CacheDuration, &secs.to_string())
            .await
    }

    /// Stored UTM parameters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn utm(&self) -> Result<UtmParams, RepositoryError> {
        Ok(UtmParams {
            source: self.get_value(SettingKey::UtmSource).await?,
            medium: self.get_value(SettingKey::UtmMedium).await?,
            campaign: self.get_value(SettingKey::UtmCampaign).await?,
        })
    }

    /// Persist UTM parameters; unset values are removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn save_utm(&self, utm: &UtmParams) -> Result<(), RepositoryError> {
        self.set_or_delete(SettingKey::UtmSource, utm.source.as_deref())
            .await?;
        self.set_or_delete(SettingKey::UtmMedium, utm.medium.as_deref())
            .await?;
        self.set_or_delete(SettingKey::UtmCampaign, utm.campaign.as_deref())
            .await
    }

    /// Display-safe summary of everything stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn snapshot(&self) -> Result<SettingsSnapshot, RepositoryError> {
        let detected = self.detected_api_version().await?;
        Ok(SettingsSnapshot {
            shop_domain: self.get_value(SettingKey::ShopDomain).await?,
            client_id: self.get_value(SettingKey::ClientId).await?,
            has_client_secret: self.get_value(SettingKey::ClientSecret).await?.is_some(),
            connected: self.get_value(SettingKey::AccessToken).await?.is_some(),
            api_version_detected: detected.is_some(),
            api_version: detected
                .unwrap_or_else(|| self.fallback_version.clone())
                .to_string(),
            cache_duration_secs: self.cache_duration().await?.as_secs(),
            utm: self.utm().await?,
        })
    }

    /// Forget the connection. The shop domain is kept so reconnecting only
    /// needs new app credentials.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn disconnect(&self) -> Result<(), RepositoryError> {
        for key in [
            SettingKey::AccessToken,
            SettingKey::ClientId,
            SettingKey::ClientSecret,
            SettingKey::ApiVersion,
        ] {
            self.store.delete(key).await?;
        }
        Ok(())
    }

    /// Remove every stored setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written.
    pub async fn reset(&self) -> Result<(), RepositoryError> {
        for key in SettingKey::ALL {
            self.store.delete(key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::new(Arc::new(MemorySettingsStore::new()), ApiVersion::fallback())
    }

    fn shop() -> ShopDomain {
        ShopDomain::parse("demo-store.myshopify.com").unwrap()
    }

    #[tokio::test]
    async fn test_api_credentials_require_token() {
        let settings = settings();
        settings
            .save_app_credentials(&shop(), "client-id", &SecretString::from("shpss_abc"))
            .await
            .unwrap();
        assert!(settings.api_credentials().await.unwrap().is_none());
        assert!(settings.app_credentials().await.unwrap().is_some());

        settings
            .save_access_token(&SecretString::from("shpat_123"))
            .await
            .unwrap();
        let creds = settings.api_credentials().await.unwrap().unwrap();
        assert_eq!(creds.shop.as_str(), "demo-store.myshopify.com");
        assert_eq!(creds.access_token.expose_secret(), "shpat_123");
        assert_eq!(creds.api_version, ApiVersion::fallback());
    }

    #[tokio::test]
    async fn test_detected_version_overrides_fallback() {
        let settings = settings();
        let version = ApiVersion::parse("2026-01").unwrap();
        settings.save_api_version(&version).await.unwrap();
        assert_eq!(settings.api_version().await.unwrap(), version);
    }

    #[tokio::test]
    async fn test_disconnect_keeps_shop_domain() {
        let settings = settings();
        settings
            .save_app_credentials(&shop(), "client-id", &SecretString::from("shpss_abc"))
            .await
            .unwrap();
        settings
            .save_access_token(&SecretString::from("shpat_123"))
            .await
            .unwrap();
        settings
            .save_api_version(&ApiVersion::parse("2026-01").unwrap())
            .await
            .unwrap();

        settings.disconnect().await.unwrap();

        assert_eq!(settings.shop_domain().await.unwrap(), Some(shop()));
        assert!(settings.app_credentials().await.unwrap().is_none());
        assert!(settings.api_credentials().await.unwrap().is_none());
        assert!(settings.detected_api_version().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_duration_defaults_and_validation() {
        let settings = settings();
        assert_eq!(
            settings.cache_duration().await.unwrap(),
            Duration::from_secs(DEFAULT_CACHE_DURATION_SECS)
        );

        settings.set_cache_duration(7200).await.unwrap();
        assert_eq!(settings.cache_duration().await.unwrap().as_secs(), 7200);

        assert!(matches!(
            settings.set_cache_duration(42).await,
            Err(RepositoryError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_utm_round_trip_drops_blanks() {
        let settings = settings();
        settings
            .save_utm(&UtmParams::new("newsletter", "  ", "spring sale"))
            .await
            .unwrap();
        let utm = settings.utm().await.unwrap();
        assert_eq!(utm.source.as_deref(), Some("newsletter"));
        assert!(utm.medium.is_none());
        assert_eq!(utm.query_string(), "utm_source=newsletter&utm_campaign=spring+sale");
    }

    #[test]
    fn test_empty_utm_query_string() {
        assert!(UtmParams::default().is_empty());
        assert_eq!(UtmParams::default().query_string(), "");
    }

    #[tokio::test]
    async fn test_reset_removes_everything() {
        let settings = settings();
        settings
            .save_app_credentials(&shop(), "client-id", &SecretString::from("shpss_abc"))
            .await
            .unwrap();
        settings.set_cache_duration(900).await.unwrap();
        settings.reset().await.unwrap();

        let snapshot = settings.snapshot().await.unwrap();
        assert!(snapshot.shop_domain.is_none());
        assert!(!snapshot.has_client_secret);
        assert_eq!(snapshot.cache_duration_secs, DEFAULT_CACHE_DURATION_SECS);
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = AppCredentials {
            shop: shop(),
            client_id: "client-id".to_string(),
            client_secret: SecretString::from("shpss_super_secret"),
        };
        let debug_output = format!("{creds:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpss_super_secret"));
    }
}
