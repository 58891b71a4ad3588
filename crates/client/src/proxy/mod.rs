//! Offline-first request interception.
//!
//! [`ProxyEngine`] wires the versioned cache, the warmer, the router, the
//! lifecycle controller and the status channel for one proxy build. Until
//! activation finishes every request passes through; afterwards requests to
//! the configured origin are routed network-first with cache fallback.

pub mod lifecycle;
pub mod router;
pub mod warmer;

use std::sync::Arc;

use offline_core::{AppConfig, CacheDb, ContextRegistry, Error, SharedStatus, StatusSync, StoreNaming, VersionedCache};
use url::Url;

pub use lifecycle::{
    ActivationReport, GcReport, InstallOutcome, LifecycleController, LifecycleState, StartReport, StoreCatalog,
    collect_stale_stores,
};
pub use router::{InterceptionRouter, Routed};
pub use warmer::{KeyOutcome, PreloadWarmer, WarmReport};

use crate::fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};

/// One running proxy build.
pub struct ProxyEngine {
    config: AppConfig,
    cache: VersionedCache,
    fetcher: Arc<dyn Fetcher>,
    router: InterceptionRouter,
    lifecycle: LifecycleController,
    status: StatusSync,
    contexts: ContextRegistry,
}

impl ProxyEngine {
    /// Open the configured database and build a reqwest-backed engine.
    pub async fn from_config(config: AppConfig) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
        Self::new(config, db, fetcher)
    }

    pub fn new(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let cache = VersionedCache::new(db, StoreNaming::new(config.app_id.clone())?);
        let contexts = ContextRegistry::default();

        let router = InterceptionRouter::new(cache.clone(), Arc::clone(&fetcher), origin.clone(), config.version);
        let warmer = PreloadWarmer::new(Arc::clone(&fetcher), origin);
        let lifecycle =
            LifecycleController::new(cache.clone(), warmer, config.manifest(), contexts.clone(), config.version);
        let status = StatusSync::new(SharedStatus::default(), contexts.clone(), config.version);

        Ok(Self { config, cache, fetcher, router, lifecycle, status, contexts })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &VersionedCache {
        &self.cache
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    pub fn status_sync(&self) -> &StatusSync {
        &self.status
    }

    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    pub fn origin(&self) -> &Url {
        self.router.origin()
    }

    /// Install and activate this build, then ask contexts for their status.
    pub async fn start(&self) -> StartReport {
        let report = self.lifecycle.start().await;
        self.status.request_status_update().await;
        report
    }

    /// Route one request.
    ///
    /// Requests seen before activation completes pass through untouched.
    pub async fn handle(&self, url: &Url) -> Routed {
        if !self.lifecycle.is_active() {
            tracing::debug!(%url, state = self.lifecycle.state().as_str(), "not active yet; passing through");
            return Routed::Passthrough;
        }
        self.router.route(url).await
    }

    /// Plain network fetch for requests the proxy declined.
    pub async fn passthrough(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.fetcher.fetch(url).await
    }
}
