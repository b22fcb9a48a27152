//! Cached product and collection reads.
//!
//! Lookups are memoized in the [`TransientCache`] under the `shopify_`
//! namespace for the configured cache duration. Editor searches are never
//! cached.

use std::sync::Arc;

use products_showcase_core::{GidKind, ShopifyGid};
use tracing::{debug, instrument};

use super::ShopifyError;
use super::client::{AdminClient, DEFAULT_TIMEOUT, STATUS_TIMEOUT};
use super::conversions::{
    convert_collection, convert_collection_summary, convert_product, convert_product_summary,
};
use super::queries::{
    self, CollectionData, CollectionProductsData, ProductData, SearchCollectionsData,
    SearchProductsData, ShopNameData,
};
use super::types::{CollectionInfo, CollectionSummary, ProductDetail, ProductSummary};
use crate::cache::{TransientCache, shopify_key};
use crate::db::{ApiCredentials, Settings};

/// Products fetched for a collection block when no limit is given.
pub const COLLECTION_PRODUCTS_DEFAULT_LIMIT: u32 = 12;
const COLLECTION_PRODUCTS_MAX_LIMIT: u32 = 250;

/// Read access to the connected store's catalog.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    client: AdminClient,
    settings: Settings,
    cache: TransientCache,
}

impl Catalog {
    #[must_use]
    pub fn new(client: AdminClient, settings: Settings, cache: TransientCache) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                client,
                settings,
                cache,
            }),
        }
    }

    async fn credentials(&self) -> Result<ApiCredentials, ShopifyError> {
        self.inner
            .settings
            .api_credentials()
            .await?
            .ok_or(ShopifyError::MissingCredentials)
    }

    async fn store_in_cache<T: serde::Serialize>(&self, key: String, value: &T) -> Result<(), ShopifyError> {
        let ttl = self.inner.settings.cache_duration().await?;
        self.inner.cache.set(key, value, ttl).await;
        Ok(())
    }

    // =========================================================================
    // Editor searches
    // =========================================================================

    /// Search products by title.
    ///
    /// Terms shorter than two characters (after removing quotes and
    /// backslashes) return an empty list without contacting Shopify.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if credentials are missing or the request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, term: &str) -> Result<Vec<ProductSummary>, ShopifyError> {
        let Some(term) = queries::sanitize_search_term(term) else {
            return Ok(Vec::new());
        };
        let credentials = self.credentials().await?;

        let data: SearchProductsData = self
            .inner
            .client
            .execute(&credentials, &queries::search_products(&term), DEFAULT_TIMEOUT)
            .await?;

        Ok(data
            .products
            .into_nodes()
            .map(convert_product_summary)
            .collect())
    }

    /// Search collections by title.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if credentials are missing or the request fails.
    #[instrument(skip(self))]
    pub async fn search_collections(
        &self,
        term: &str,
    ) -> Result<Vec<CollectionSummary>, ShopifyError> {
        let Some(term) = queries::sanitize_search_term(term) else {
            return Ok(Vec::new());
        };
        let credentials = self.credentials().await?;
        let body = queries::search_collections(&term, &credentials.api_version);

        let data: SearchCollectionsData = self
            .inner
            .client
            .execute(&credentials, &body, DEFAULT_TIMEOUT)
            .await?;

        Ok(data
            .collections
            .into_nodes()
            .map(convert_collection_summary)
            .collect())
    }

    // =========================================================================
    // Cached lookups
    // =========================================================================

    /// Fetch a product by numeric id or GID. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::InvalidId` for malformed ids, or any transport
    /// error on a cache miss.
    #[instrument(skip(self))]
    pub async fn fetch_product(&self, id: &str) -> Result<Option<ProductDetail>, ShopifyError> {
        let gid = ShopifyGid::normalize(GidKind::Product, id)?;
        let cache_key = shopify_key("product", gid.as_str());

        if let Some(product) = self.inner.cache.get::<ProductDetail>(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let credentials = self.credentials().await?;
        let data: ProductData = self
            .inner
            .client
            .execute(&credentials, &queries::product(&gid), DEFAULT_TIMEOUT)
            .await?;

        let Some(product) = data.product.map(convert_product) else {
            return Ok(None);
        };
        self.store_in_cache(cache_key, &product).await?;
        Ok(Some(product))
    }

    /// Fetch up to `limit` products of a collection (clamped to 1..=250).
    ///
    /// An unknown collection yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::InvalidId` for malformed ids, or any transport
    /// error on a cache miss.
    #[instrument(skip(self))]
    pub async fn fetch_collection_products(
        &self,
        id: &str,
        limit: u32,
    ) -> Result<Vec<ProductDetail>, ShopifyError> {
        let gid = ShopifyGid::normalize(GidKind::Collection, id)?;
        let limit = limit.clamp(1, COLLECTION_PRODUCTS_MAX_LIMIT);
        let cache_key = shopify_key("collection_products", &format!("{gid}{limit}"));

        if let Some(products) = self.inner.cache.get::<Vec<ProductDetail>>(&cache_key).await {
            debug!("Cache hit for collection products");
            return Ok(products);
        }

        let credentials = self.credentials().await?;
        let data: CollectionProductsData = self
            .inner
            .client
            .execute(
                &credentials,
                &queries::collection_products(&gid, limit),
                DEFAULT_TIMEOUT,
            )
            .await?;

        let products: Vec<ProductDetail> = data
            .collection
            .map(|collection| {
                collection
                    .products
                    .into_nodes()
                    .map(convert_product)
                    .collect()
            })
            .unwrap_or_default();

        if !products.is_empty() {
            self.store_in_cache(cache_key, &products).await?;
        }
        Ok(products)
    }

    /// Fetch a collection's title, handle and image.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::InvalidId` for malformed ids, or any transport
    /// error on a cache miss.
    #[instrument(skip(self))]
    pub async fn fetch_collection(&self, id: &str) -> Result<Option<CollectionInfo>, ShopifyError> {
        let gid = ShopifyGid::normalize(GidKind::Collection, id)?;
        let cache_key = shopify_key("collection", gid.as_str());

        if let Some(collection) = self.inner.cache.get::<CollectionInfo>(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(Some(collection));
        }

        let credentials = self.credentials().await?;
        let data: CollectionData = self
            .inner
            .client
            .execute(&credentials, &queries::collection(&gid), DEFAULT_TIMEOUT)
            .await?;

        let Some(collection) = data.collection.map(convert_collection) else {
            return Ok(None);
        };
        self.store_in_cache(cache_key, &collection).await?;
        Ok(Some(collection))
    }

    /// The connected shop's display name. Never cached.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if credentials are missing or the request fails.
    #[instrument(skip(self))]
    pub async fn shop_name(&self) -> Result<String, ShopifyError> {
        let credentials = self.credentials().await?;
        let data: ShopNameData = self
            .inner
            .client
            .execute(&credentials, &queries::shop_name(), STATUS_TIMEOUT)
            .await?;
        Ok(data.shop.name)
    }
}
