//! Expiring key/value cache ("transients").
//!
//! Values are stored as JSON with a per-entry TTL. Keys are grouped by
//! prefix so a whole namespace can be counted or invalidated at once:
//!
//! - [`SHOPIFY_PREFIX`] - Admin API read results
//! - [`OAUTH_STATE_PREFIX`] - pending OAuth authorizations
//! - [`FLASH_PREFIX`] - one-shot notices for the settings page

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Namespace for cached Shopify responses.
pub const SHOPIFY_PREFIX: &str = "shopify_";
/// Namespace for pending OAuth states.
pub const OAUTH_STATE_PREFIX: &str = "oauth_state_";
/// Namespace for flash notices.
pub const FLASH_PREFIX: &str = "flash_";

#[derive(Clone)]
struct Entry {
    value: Arc<Value>,
    ttl: Duration,
    expires_at: Instant,
}

impl Entry {
    // `remove` hands back entries that expired but were not yet evicted.
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache with per-entry expiry and no size bound.
#[derive(Clone)]
pub struct TransientCache {
    inner: Cache<String, Entry>,
}

impl Default for TransientCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TransientCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Read a live entry. Entries that no longer deserialize as `T` are dropped.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.inner.get(key).await?;
        match T::deserialize(entry.value.as_ref()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.inner.invalidate(key).await;
                None
            }
        }
    }

    /// Store a value for `ttl`.
    pub async fn set<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.inner
                    .insert(
                        key,
                        Entry {
                            value: Arc::new(value),
                            ttl,
                            expires_at: Instant::now() + ttl,
                        },
                    )
                    .await;
            }
            Err(e) => warn!(key, error = %e, "Skipping unserializable cache value"),
        }
    }

    /// Remove and return a live entry. Concurrent callers never both receive it.
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.inner.remove(key).await.filter(Entry::is_live)?;
        T::deserialize(entry.value.as_ref()).ok()
    }

    /// Invalidate every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&self, prefix: &str) -> usize {
        let keys: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();

        let mut removed = 0;
        for key in keys {
            if self
                .inner
                .remove(key.as_str())
                .await
                .is_some_and(|entry| entry.is_live())
            {
                removed += 1;
            }
        }

        debug!(prefix, removed, "Cleared cache namespace");
        removed
    }

    /// Number of live entries whose key starts with `prefix`.
    ///
    /// Flushes pending maintenance first so recent writes are counted.
    pub async fn count(&self, prefix: &str) -> usize {
        self.inner.run_pending_tasks().await;
        self.inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .count()
    }
}

/// Cache key for a Shopify read: `shopify_{kind}_{sha256(identity)}`.
#[must_use]
pub fn shopify_key(kind: &str, identity: &str) -> String {
    format!(
        "{SHOPIFY_PREFIX}{kind}_{}",
        hex::encode(Sha256::digest(identity.as_bytes()))
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = TransientCache::new();
        cache.set("shopify_product_a", &vec![1, 2, 3], MINUTE).await;
        let value: Vec<i32> = cache.get("shopify_product_a").await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert!(cache.get::<Vec<i32>>("shopify_product_b").await.is_none());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = TransientCache::new();
        cache
            .set("flash_notice", &"hello", Duration::from_millis(50))
            .await;
        assert!(cache.get::<String>("flash_notice").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get::<String>("flash_notice").await.is_none());
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let cache = TransientCache::new();
        cache.set("oauth_state_abc", &"demo", MINUTE).await;
        assert_eq!(
            cache.take::<String>("oauth_state_abc").await.as_deref(),
            Some("demo")
        );
        assert!(cache.take::<String>("oauth_state_abc").await.is_none());
    }

    #[tokio::test]
    async fn test_take_ignores_expired_entry() {
        let cache = TransientCache::new();
        cache
            .set("oauth_state_old", &"demo", Duration::from_millis(50))
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.take::<String>("oauth_state_old").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_only_touches_prefix() {
        let cache = TransientCache::new();
        cache.set("shopify_product_1", &1, MINUTE).await;
        cache.set("shopify_collection_2", &2, MINUTE).await;
        cache.set("oauth_state_3", &3, MINUTE).await;
        cache.inner.run_pending_tasks().await;

        assert_eq!(cache.count(SHOPIFY_PREFIX).await, 2);
        assert_eq!(cache.clear(SHOPIFY_PREFIX).await, 2);
        assert_eq!(cache.count(SHOPIFY_PREFIX).await, 0);
        assert_eq!(cache.get::<i32>("oauth_state_3").await, Some(3));
    }

    #[test]
    fn test_shopify_key_is_hashed() {
        let key = shopify_key("product", "gid://shopify/Product/1");
        assert!(key.starts_with("shopify_product_"));
        assert_eq!(key.len(), "shopify_product_".len() + 64);
        assert_ne!(key, shopify_key("product", "gid://shopify/Product/2"));
    }
}
