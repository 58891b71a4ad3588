//! Network-first routing with cache fallback.
//!
//! Same-origin requests always try the network. A success response is
//! snapshotted into the current store and returned; any failure falls back
//! to the snapshot for the request path. Cross-origin requests are left to
//! the caller.

use std::sync::Arc;

use offline_core::{CacheRecord, CacheStore, VersionedCache};
use url::Url;

use crate::fetch::{FetchResponse, Fetcher, resource_key, same_origin};

/// Result of routing one request.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Not ours to handle; the request goes out untouched.
    Passthrough,
    /// Live response. `stored` is false when the snapshot write failed.
    Network { response: FetchResponse, stored: bool },
    /// Live fetch failed; served from the current store.
    Cache(CacheRecord),
    /// Live fetch failed and the current store has nothing for the path.
    Unhandled,
}

impl Routed {
    pub fn is_handled(&self) -> bool {
        matches!(self, Routed::Network { .. } | Routed::Cache(_))
    }
}

/// Per-request routing for one proxy build.
#[derive(Clone)]
pub struct InterceptionRouter {
    cache: VersionedCache,
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    version: u64,
}

impl InterceptionRouter {
    pub fn new(cache: VersionedCache, fetcher: Arc<dyn Fetcher>, origin: Url, version: u64) -> Self {
        Self { cache, fetcher, origin, version }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether requests to `url` are intercepted at all.
    pub fn intercepts(&self, url: &Url) -> bool {
        same_origin(&self.origin, url)
    }

    pub async fn route(&self, url: &Url) -> Routed {
        if !self.intercepts(url) {
            tracing::debug!(%url, "cross-origin request passes through");
            return Routed::Passthrough;
        }

        let key = resource_key(url);
        let store = match self.cache.open(self.version).await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(version = self.version, error = %e, "failed to open cache store");
                None
            }
        };

        match self.fetcher.fetch(url).await {
            Ok(response) if response.is_success() => {
                let stored = match &store {
                    Some(store) => self.store_snapshot(store, &key, &response).await,
                    None => false,
                };
                tracing::debug!(%key, stored, "served from network");
                Routed::Network { response, stored }
            }
            Ok(response) => {
                tracing::debug!(%key, status = response.status.as_u16(), "network returned non-success");
                self.fallback(store.as_ref(), &key).await
            }
            Err(e) => {
                tracing::debug!(%key, error = %e, "network fetch failed");
                self.fallback(store.as_ref(), &key).await
            }
        }
    }

    async fn store_snapshot(&self, store: &CacheStore, key: &str, response: &FetchResponse) -> bool {
        match store.put(key, &response.to_record()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, store = store.name(), error = %e, "failed to cache response");
                false
            }
        }
    }

    async fn fallback(&self, store: Option<&CacheStore>, key: &str) -> Routed {
        let Some(store) = store else {
            return Routed::Unhandled;
        };

        match store.get(key).await {
            Ok(Some(record)) => {
                tracing::debug!(key, store = store.name(), "served from cache");
                Routed::Cache(record)
            }
            Ok(None) => {
                tracing::debug!(key, store = store.name(), "no cached response");
                Routed::Unhandled
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache lookup failed");
                Routed::Unhandled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFetcher;
    use offline_core::{CacheDb, StoreNaming};

    const ORIGIN: &str = "http://localhost:8049";

    async fn setup(version: u64) -> (Arc<ScriptedFetcher>, InterceptionRouter, VersionedCache) {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let cache = VersionedCache::new(CacheDb::open_in_memory().await.unwrap(), StoreNaming::new("app").unwrap());
        let router = InterceptionRouter::new(cache.clone(), fetcher.clone(), Url::parse(ORIGIN).unwrap(), version);
        (fetcher, router, cache)
    }

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn test_success_is_returned_and_stored() {
        let (fetcher, router, cache) = setup(5).await;
        fetcher.respond("/about", 200, "<h1>About</h1>");

        let routed = router.route(&url("/about")).await;

        match routed {
            Routed::Network { response, stored } => {
                assert!(stored);
                assert_eq!(response.bytes.as_ref(), b"<h1>About</h1>");
            }
            other => panic!("expected network response, got {other:?}"),
        }
        let record = cache.open(5).await.unwrap().get("/about").await.unwrap().unwrap();
        assert_eq!(record.body, b"<h1>About</h1>");
    }

    #[tokio::test]
    async fn test_offline_serves_exact_snapshot() {
        let (fetcher, router, cache) = setup(5).await;
        fetcher.respond_with_type("/js/home.js", 200, vec![0u8, 1, 2, 255], "application/javascript");
        router.route(&url("/js/home.js")).await;
        let stored = cache.open(5).await.unwrap().get("/js/home.js").await.unwrap().unwrap();

        fetcher.set_offline(true);
        let routed = router.route(&url("/js/home.js")).await;

        match routed {
            Routed::Cache(record) => {
                assert_eq!(record, stored);
                assert_eq!(record.status, 200);
                assert_eq!(record.body, vec![0u8, 1, 2, 255]);
                assert_eq!(record.content_type(), Some("application/javascript"));
            }
            other => panic!("expected cached response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_falls_back_to_cache() {
        let (fetcher, router, _cache) = setup(5).await;
        fetcher.respond("/", 200, "home v1");
        router.route(&url("/")).await;

        fetcher.respond("/", 503, "down");
        match router.route(&url("/")).await {
            Routed::Cache(record) => assert_eq!(record.body, b"home v1"),
            other => panic!("expected cached response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_does_not_overwrite_snapshot() {
        let (fetcher, router, cache) = setup(5).await;
        fetcher.respond("/", 200, "good");
        router.route(&url("/")).await;
        fetcher.respond("/", 404, "missing");
        router.route(&url("/")).await;

        let record = cache.open(5).await.unwrap().get("/").await.unwrap().unwrap();
        assert_eq!(record.body, b"good");
    }

    #[tokio::test]
    async fn test_miss_in_current_store_is_unhandled_even_if_older_store_has_it() {
        let (fetcher, router, cache) = setup(5).await;
        cache
            .open(4)
            .await
            .unwrap()
            .put("/x", &CacheRecord::new(200, Vec::new(), b"old".to_vec()))
            .await
            .unwrap();
        fetcher.fail("/x");

        let routed = router.route(&url("/x")).await;

        assert!(matches!(routed, Routed::Unhandled));
        assert!(!routed.is_handled());
    }

    #[tokio::test]
    async fn test_offline_page_is_not_substituted() {
        let (fetcher, router, _cache) = setup(5).await;
        fetcher.respond("/offline", 200, "you are offline");
        router.route(&url("/offline")).await;

        fetcher.set_offline(true);
        assert!(matches!(router.route(&url("/posts/42")).await, Routed::Unhandled));
    }

    #[tokio::test]
    async fn test_cross_origin_is_passthrough_and_untouched() {
        let (fetcher, router, cache) = setup(5).await;

        let routed = router.route(&Url::parse("https://cdn.example.com/lib.js").unwrap()).await;

        assert!(matches!(routed, Routed::Passthrough));
        assert_eq!(fetcher.call_count(), 0);
        assert!(cache.list_store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_string_shares_path_key() {
        let (fetcher, router, cache) = setup(5).await;
        fetcher.respond("/js/blog.js", 200, "blog");

        router.route(&url("/js/blog.js?v=2")).await;

        let keys = cache.open(5).await.unwrap().keys().await.unwrap();
        assert_eq!(keys, vec!["/js/blog.js".to_string()]);
    }

    #[tokio::test]
    async fn test_store_write_failure_still_returns_network_response() {
        let (fetcher, _router, cache) = setup(5).await;
        fetcher.respond("/a", 200, "a");
        let store = cache.open(5).await.unwrap();
        cache.delete(store.name()).await.unwrap();

        let router = InterceptionRouter::new(cache.clone(), fetcher.clone(), Url::parse(ORIGIN).unwrap(), 5);
        let response = fetcher.fetch(&url("/a")).await.unwrap();
        assert!(!router.store_snapshot(&store, "/a", &response).await);
    }

    #[tokio::test]
    async fn test_routing_reopens_store_deleted_by_another_instance() {
        let (fetcher, router, cache) = setup(5).await;
        fetcher.respond("/a", 200, "a");
        cache.open(5).await.unwrap();
        cache.delete("app-5").await.unwrap();

        match router.route(&url("/a")).await {
            Routed::Network { stored, .. } => assert!(stored),
            other => panic!("expected network response, got {other:?}"),
        }
    }
}
