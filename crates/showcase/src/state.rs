//! Application state shared across handlers.

use std::sync::Arc;

use crate::cache::TransientCache;
use crate::config::ShowcaseConfig;
use crate::db::{Settings, SettingsStore};
use crate::render::Renderer;
use crate::shopify::{AdminClient, Catalog, OAuthFlow, ShopifyError};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ShowcaseConfig,
    settings: Settings,
    cache: TransientCache,
    catalog: Catalog,
    oauth: OAuthFlow,
    renderer: Renderer,
}

impl AppState {
    /// Wire up the service around a settings store.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Transport` if the HTTP client cannot be built.
    pub fn new(config: ShowcaseConfig, store: Arc<dyn SettingsStore>) -> Result<Self, ShopifyError> {
        let settings = Settings::new(store, config.shopify.api_version_fallback.clone());
        let cache = TransientCache::new();
        let client = AdminClient::new(&config.shopify)?;

        let catalog = Catalog::new(client.clone(), settings.clone(), cache.clone());
        let oauth = OAuthFlow::new(client, settings.clone(), cache.clone(), config.redirect_uri());
        let renderer = Renderer::new(catalog.clone(), settings.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                settings,
                cache,
                catalog,
                oauth,
                renderer,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ShowcaseConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    #[must_use]
    pub fn cache(&self) -> &TransientCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthFlow {
        &self.inner.oauth
    }

    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.inner.renderer
    }
}
