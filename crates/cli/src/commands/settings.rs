//! Settings inspection and maintenance.
//!
//! These act on the same `showcase.settings` table the server reads, so
//! changes take effect on the server's next request. Cached Shopify data in a
//! running server is not cleared from here.

use std::sync::Arc;

use products_showcase::cache::TransientCache;
use products_showcase::config::ShopifyConfig;
use products_showcase::db::{PgSettingsStore, Settings, UtmParams};
use products_showcase::shopify::{AdminClient, OAuthFlow};

use super::{CommandError, connect};

async fn open() -> Result<(Settings, ShopifyConfig), CommandError> {
    let pool = connect().await?;
    let shopify = ShopifyConfig::from_env()?;
    let settings = Settings::new(
        Arc::new(PgSettingsStore::new(pool)),
        shopify.api_version_fallback.clone(),
    );
    Ok((settings, shopify))
}

/// Print stored settings as JSON; secrets are reported only as present.
pub async fn show() -> Result<(), CommandError> {
    let (settings, _) = open().await?;
    let snapshot = settings.snapshot().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

pub async fn set_utm(source: &str, medium: &str, campaign: &str) -> Result<(), CommandError> {
    let (settings, _) = open().await?;
    let utm = UtmParams::new(source, medium, campaign);
    settings.save_utm(&utm).await?;

    if utm.is_empty() {
        tracing::info!("UTM parameters cleared");
    } else {
        tracing::info!(query = %utm.query_string(), "UTM parameters saved");
    }
    Ok(())
}

pub async fn set_cache_duration(seconds: u64) -> Result<(), CommandError> {
    let (settings, _) = open().await?;
    settings.set_cache_duration(seconds).await?;
    tracing::info!(seconds, "Cache duration saved");
    Ok(())
}

/// Detect the newest supported Admin API version with the stored token.
pub async fn refresh_api_version() -> Result<(), CommandError> {
    let (settings, shopify) = open().await?;
    let client = AdminClient::new(&shopify)?;
    // No authorization is started from here, so no redirect URI is needed
    let oauth = OAuthFlow::new(client, settings.clone(), TransientCache::new(), String::new());

    match oauth.refresh_api_version().await? {
        Some(version) => tracing::info!(%version, "API version updated"),
        None => tracing::warn!(
            current = %settings.api_version().await?,
            "Could not detect the API version; keeping the current one"
        ),
    }
    Ok(())
}

/// Remove every stored setting.
pub async fn reset(confirmed: bool) -> Result<(), CommandError> {
    if !confirmed {
        return Err(CommandError::NotConfirmed);
    }

    let (settings, _) = open().await?;
    settings.reset().await?;
    tracing::info!("All settings removed");
    Ok(())
}
