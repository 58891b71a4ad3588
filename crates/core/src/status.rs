//! Connectivity and session status shared between the proxy and its contexts.
//!
//! ### Wire shapes
//! - proxy → context: `{ "requestStatusUpdate": true }`
//! - context → proxy: `{ "statusUpdate": { "isOnline": bool, "isLoggedIn": bool } }`
//!
//! Both directions are fire-and-forget. Updates replace the whole status and
//! the last one applied wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;
use crate::contexts::ContextRegistry;

/// Flags reported by the hosting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStatus {
    pub is_online: bool,
    pub is_logged_in: bool,
}

impl Default for ProxyStatus {
    fn default() -> Self {
        Self { is_online: true, is_logged_in: false }
    }
}

/// Messages exchanged over the status channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProxyMessage {
    RequestStatusUpdate(bool),
    StatusUpdate(ProxyStatus),
}

impl ProxyMessage {
    pub fn request_status_update() -> Self {
        ProxyMessage::RequestStatusUpdate(true)
    }

    /// Decode a message from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Owned, cloneable handle to the proxy's status.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<RwLock<ProxyStatus>>,
}

impl SharedStatus {
    pub fn new(status: ProxyStatus) -> Self {
        Self { inner: Arc::new(RwLock::new(status)) }
    }

    pub async fn get(&self) -> ProxyStatus {
        *self.inner.read().await
    }

    pub async fn replace(&self, status: ProxyStatus) {
        *self.inner.write().await = status;
    }
}

/// Solicits status from contexts and applies their replies.
#[derive(Debug, Clone)]
pub struct StatusSync {
    status: SharedStatus,
    contexts: ContextRegistry,
    version: u64,
}

impl StatusSync {
    pub fn new(status: SharedStatus, contexts: ContextRegistry, version: u64) -> Self {
        Self { status, contexts, version }
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    /// Ask every connected context, controlled or not, to report its status.
    ///
    /// Returns how many contexts the request was handed to.
    pub async fn request_status_update(&self) -> usize {
        let delivered = self.contexts.publish(&ProxyMessage::request_status_update()).await;
        tracing::debug!(version = self.version, delivered, "requested status update");
        delivered
    }

    /// Apply a message received from a context.
    ///
    /// Status updates replace the current status; anything else is ignored.
    pub async fn receive(&self, message: ProxyMessage) {
        if let ProxyMessage::StatusUpdate(status) = message {
            self.status.replace(status).await;
            tracing::info!(
                version = self.version,
                is_online = status.is_online,
                is_logged_in = status.is_logged_in,
                "status update"
            );
        }
    }

    /// Decode and apply a raw JSON message.
    pub async fn receive_json(&self, raw: &str) -> Result<(), Error> {
        let message = ProxyMessage::from_json(raw)?;
        self.receive(message).await;
        Ok(())
    }
}
