//! Registry of connected contexts (documents that route requests through
//! the proxy).
//!
//! Each context has a one-way inbox. Publishing is fire-and-forget: a
//! context whose inbox is closed is dropped from the registry and the
//! message is lost.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};

use crate::status::ProxyMessage;

pub type ContextId = u64;

#[derive(Debug)]
struct ContextEntry {
    controller: Option<u64>,
    sender: mpsc::UnboundedSender<ProxyMessage>,
}

/// Snapshot of one registered context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextInfo {
    pub id: ContextId,
    /// Build version of the proxy instance controlling this context, if any.
    pub controller: Option<u64>,
}

/// Shared registry of connected contexts.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    inner: Arc<RwLock<HashMap<ContextId, ContextEntry>>>,
    next_id: Arc<AtomicU64>,
}

impl ContextRegistry {
    /// Register a context, returning its id and the receiving end of its inbox.
    pub async fn register(&self, controller: Option<u64>) -> (ContextId, mpsc::UnboundedReceiver<ProxyMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .write()
            .await
            .insert(id, ContextEntry { controller, sender });
        tracing::debug!(context = id, ?controller, "context registered");
        (id, receiver)
    }

    pub async fn unregister(&self, id: ContextId) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    /// Contexts currently registered, ordered by id.
    pub async fn list(&self) -> Vec<ContextInfo> {
        let contexts = self.inner.read().await;
        let mut out: Vec<ContextInfo> = contexts
            .iter()
            .map(|(id, entry)| ContextInfo { id: *id, controller: entry.controller })
            .collect();
        out.sort_by_key(|c| c.id);
        out
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Make `version` the controller of every registered context.
    ///
    /// Returns how many contexts changed controller.
    pub async fn claim(&self, version: u64) -> usize {
        let mut contexts = self.inner.write().await;
        let mut claimed = 0;
        for entry in contexts.values_mut() {
            if entry.controller != Some(version) {
                entry.controller = Some(version);
                claimed += 1;
            }
        }
        claimed
    }

    /// Hand `message` to every registered context.
    ///
    /// Returns how many inboxes accepted it.
    pub async fn publish(&self, message: &ProxyMessage) -> usize {
        let mut contexts = self.inner.write().await;
        let before = contexts.len();
        contexts.retain(|id, entry| {
            let open = entry.sender.send(message.clone()).is_ok();
            if !open {
                tracing::debug!(context = *id, "dropping closed context");
            }
            open
        });
        let delivered = contexts.len();
        if delivered < before {
            tracing::debug!(dropped = before - delivered, "pruned closed contexts");
        }
        delivered
    }
}
