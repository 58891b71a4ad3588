//! Pre-warming of manifest resources into a store.
//!
//! Each manifest key runs as its own task; one failing key never affects the
//! others. The report is informational and may be ignored.

use std::collections::HashMap;
use std::sync::Arc;

use offline_core::{CacheStore, Manifest};
use serde::Serialize;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Fetcher, resolve_key};

/// What happened to one manifest key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOutcome {
    /// Fetched and written.
    Stored,
    /// Already present and not forced; no fetch was made.
    AlreadyCached,
    /// Fetch, status or write failed; the key was skipped.
    Failed(String),
}

/// Per-key results of one warming pass, in manifest order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmReport {
    pub stored: Vec<String>,
    pub already_cached: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl WarmReport {
    pub fn total(&self) -> usize {
        self.stored.len() + self.already_cached.len() + self.failed.len()
    }
}

/// Fetches manifest resources from the proxy's origin into a store.
#[derive(Clone)]
pub struct PreloadWarmer {
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
}

impl PreloadWarmer {
    pub fn new(fetcher: Arc<dyn Fetcher>, origin: Url) -> Self {
        Self { fetcher, origin }
    }

    /// Make sure every manifest key is present in `store`.
    ///
    /// With `force_refresh` unset, keys that already have a record are left
    /// alone without touching the network. Returns once every key resolved.
    pub async fn warm(&self, store: &CacheStore, manifest: &Manifest, force_refresh: bool) -> WarmReport {
        let mut join_set = JoinSet::new();

        for key in manifest.iter() {
            let key = key.to_string();
            let store = store.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let origin = self.origin.clone();

            join_set.spawn(async move {
                let outcome = warm_key(fetcher.as_ref(), &origin, &store, &key, force_refresh).await;
                (key, outcome)
            });
        }

        let mut outcomes: HashMap<String, KeyOutcome> = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((key, outcome)) => {
                    outcomes.insert(key, outcome);
                }
                Err(e) => tracing::warn!(error = %e, "warm task aborted"),
            }
        }

        let mut report = WarmReport::default();
        for key in manifest.iter() {
            match outcomes.remove(key) {
                Some(KeyOutcome::Stored) => report.stored.push(key.to_string()),
                Some(KeyOutcome::AlreadyCached) => report.already_cached.push(key.to_string()),
                Some(KeyOutcome::Failed(reason)) => report.failed.push((key.to_string(), reason)),
                None => report.failed.push((key.to_string(), "task aborted".to_string())),
            }
        }

        tracing::debug!(
            store = store.name(),
            force_refresh,
            stored = report.stored.len(),
            already_cached = report.already_cached.len(),
            failed = report.failed.len(),
            "warmed store"
        );

        report
    }
}

async fn warm_key(
    fetcher: &dyn Fetcher, origin: &Url, store: &CacheStore, key: &str, force_refresh: bool,
) -> KeyOutcome {
    if !force_refresh {
        match store.get(key).await {
            Ok(Some(_)) => return KeyOutcome::AlreadyCached,
            Ok(None) => {}
            Err(e) => tracing::debug!(key, error = %e, "cache lookup failed; fetching"),
        }
    }

    let url = match resolve_key(origin, key) {
        Ok(url) => url,
        Err(e) => return KeyOutcome::Failed(e.to_string()),
    };

    let response = match fetcher.fetch(&url).await {
        Ok(response) => response,
        Err(e) => return KeyOutcome::Failed(e.to_string()),
    };

    if !response.is_success() {
        return KeyOutcome::Failed(format!("status {}", response.status.as_u16()));
    }

    match store.put(key, &response.to_record()).await {
        Ok(()) => KeyOutcome::Stored,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to store pre-warmed resource");
            KeyOutcome::Failed(e.to_string())
        }
    }
}
