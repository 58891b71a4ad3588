//! Install and activation of a proxy build.
//!
//! ### States
//! `Installing → Installed → Activating → Activated`
//!
//! ### Install
//! Creates the current store, starts warming it in the background without
//! forcing, and signals readiness to take over right away (skip waiting)
//! instead of waiting for older instances to be released. The transition
//! never waits on the network.
//!
//! ### Activate
//! 1. Scan store names and pick those of this app with another version.
//! 2. Delete them, each independently.
//! 3. Re-warm the current store with `force_refresh`.
//! 4. Claim every connected context.
//!
//! Partial failures are reported, never rolled back; the controller always
//! ends in `Activated`.

use async_trait::async_trait;
use offline_core::{ContextRegistry, Error, Manifest, StoreNaming, VersionedCache};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;

use super::warmer::{PreloadWarmer, WarmReport};

/// Lifecycle phase of this proxy build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Activated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    /// Whether the install-time warm pass was started.
    pub warming: bool,
    pub skip_waiting: bool,
}

/// Result of stale-store collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GcReport {
    /// Names seen by the scan phase.
    pub scanned: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Set when the store list itself could not be read.
    pub scan_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub gc: GcReport,
    pub warm: WarmReport,
    pub claimed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    pub install: InstallOutcome,
    pub activation: ActivationReport,
}

/// Drives one build's install and activation.
pub struct LifecycleController {
    cache: VersionedCache,
    warmer: PreloadWarmer,
    manifest: Manifest,
    contexts: ContextRegistry,
    version: u64,
    state: watch::Sender<LifecycleState>,
    install_warm: Mutex<JoinSet<WarmReport>>,
}

impl LifecycleController {
    pub fn new(
        cache: VersionedCache, warmer: PreloadWarmer, manifest: Manifest, contexts: ContextRegistry, version: u64,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Installing);
        Self { cache, warmer, manifest, contexts, version, state, install_warm: Mutex::new(JoinSet::new()) }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Activated
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::info!(version = self.version, from = previous.as_str(), to = next.as_str(), "lifecycle transition");
    }

    /// Start warming the current store and mark this build installed.
    pub async fn install(&self) -> InstallOutcome {
        self.transition(LifecycleState::Installing);

        let warming = match self.cache.open(self.version).await {
            Ok(store) => {
                let warmer = self.warmer.clone();
                let manifest = self.manifest.clone();
                self.install_warm
                    .lock()
                    .await
                    .spawn(async move { warmer.warm(&store, &manifest, false).await });
                true
            }
            Err(e) => {
                tracing::warn!(version = self.version, error = %e, "failed to open cache store for warming");
                false
            }
        };

        self.transition(LifecycleState::Installed);
        tracing::info!(version = self.version, "installed; skipping wait for older instances");

        InstallOutcome { warming, skip_waiting: true }
    }

    /// Wait for the install-time warm pass.
    ///
    /// Returns `None` when no pass was started or it has already been
    /// collected.
    pub async fn install_warm(&self) -> Option<WarmReport> {
        let mut pending = self.install_warm.lock().await;
        let mut report = None;
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(warm) => report = Some(warm),
                Err(e) => tracing::warn!(error = %e, "install warm task aborted"),
            }
        }
        report
    }

    /// Replace older builds' stores and take control of open contexts.
    pub async fn activate(&self) -> ActivationReport {
        self.transition(LifecycleState::Activating);

        let gc = self.collect_garbage().await;
        let warm = self.warm(true).await;
        let claimed = self.contexts.claim(self.version).await;

        self.transition(LifecycleState::Activated);
        tracing::info!(
            version = self.version,
            deleted = gc.deleted.len(),
            gc_failed = gc.failed.len(),
            refreshed = warm.stored.len(),
            warm_failed = warm.failed.len(),
            claimed,
            "activated"
        );

        ActivationReport { gc, warm, claimed }
    }

    /// Install, then activate immediately.
    pub async fn start(&self) -> StartReport {
        let install = self.install().await;
        let activation = self.activate().await;
        StartReport { install, activation }
    }

    /// Delete every store of this app whose version differs from ours.
    ///
    /// Names that do not parse as `<app_id>-<integer>` are kept.
    pub async fn collect_garbage(&self) -> GcReport {
        collect_stale_stores(&self.cache, self.cache.naming(), self.version).await
    }

    async fn warm(&self, force_refresh: bool) -> WarmReport {
        match self.cache.open(self.version).await {
            Ok(store) => self.warmer.warm(&store, &self.manifest, force_refresh).await,
            Err(e) => {
                tracing::warn!(version = self.version, error = %e, "failed to open cache store for warming");
                WarmReport {
                    failed: self.manifest.iter().map(|k| (k.to_string(), e.to_string())).collect(),
                    ..Default::default()
                }
            }
        }
    }
}

/// Store listing and deletion, as used by garbage collection.
#[async_trait]
pub trait StoreCatalog: Clone + Send + Sync + 'static {
    async fn list_store_names(&self) -> Result<Vec<String>, Error>;
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;
}

#[async_trait]
impl StoreCatalog for VersionedCache {
    async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        self.db().list_store_names().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        self.db().delete_store(name).await
    }
}

/// Scan `catalog` for stores of `naming` with a version other than
/// `current`, then delete them concurrently.
///
/// A failed deletion is recorded and does not stop the others.
pub async fn collect_stale_stores<C: StoreCatalog>(catalog: &C, naming: &StoreNaming, current: u64) -> GcReport {
    let names = match catalog.list_store_names().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "failed to list cache stores");
            return GcReport { scan_error: Some(e.to_string()), ..Default::default() };
        }
    };

    let stale = naming.stale_names(names.iter().map(String::as_str), current);

    let mut join_set = JoinSet::new();
    for name in stale {
        let catalog = catalog.clone();
        join_set.spawn(async move {
            let result = catalog.delete_store(&name).await;
            (name, result)
        });
    }

    let mut report = GcReport { scanned: names.len(), ..Default::default() };
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((name, Ok(true))) => {
                tracing::debug!(store = %name, "deleted stale store");
                report.deleted.push(name);
            }
            Ok((name, Ok(false))) => tracing::debug!(store = %name, "stale store already gone"),
            Ok((name, Err(e))) => {
                tracing::warn!(store = %name, error = %e, "failed to delete stale store");
                report.failed.push((name, e.to_string()));
            }
            Err(e) => tracing::warn!(error = %e, "store deletion task aborted"),
        }
    }
    report.deleted.sort();
    report.failed.sort();
    report
}
