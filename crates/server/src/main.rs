//! offline-proxy server entry point.
//!
//! Boots the proxy engine, then serves MCP on stdio. The connected client is
//! registered as a page context: proxy messages addressed to it arrive as
//! logging notifications. Logging goes to stderr to keep stdout for JSON-RPC.

use std::sync::Arc;

use anyhow::Result;
use offline_client::ProxyEngine;
use offline_core::{AppConfig, ProxyMessage};
use rmcp::model::{LoggingLevel, LoggingMessageNotificationParam};
use rmcp::service::{Peer, RoleServer, serve_server};
use rmcp::transport::io::stdio;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = config.version,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting offline-proxy server on stdio transport"
    );

    let engine = Arc::new(ProxyEngine::from_config(config).await?);
    let handler = handler::OfflineProxyServer::new(Arc::clone(&engine));
    let server = serve_server(handler, stdio()).await?;

    let (context_id, inbox) = engine.contexts().register(None).await;
    tokio::spawn(forward_messages(server.peer().clone(), inbox));

    let starter = Arc::clone(&engine);
    tokio::spawn(async move {
        let report = starter.start().await;
        tracing::info!(
            refreshed = report.activation.warm.stored.len(),
            warm_failed = report.activation.warm.failed.len(),
            deleted = report.activation.gc.deleted.len(),
            claimed = report.activation.claimed,
            "proxy active"
        );
    });

    server.waiting().await?;
    engine.contexts().unregister(context_id).await;

    Ok(())
}

/// Deliver proxy messages to the connected client.
async fn forward_messages(peer: Peer<RoleServer>, mut inbox: mpsc::UnboundedReceiver<ProxyMessage>) {
    while let Some(message) = inbox.recv().await {
        let param = LoggingMessageNotificationParam {
            level: LoggingLevel::Info,
            logger: Some("offline-proxy".into()),
            data: message.to_json(),
        };
        if let Err(e) = peer.notify_logging_message(param).await {
            tracing::warn!(error = %e, "failed to deliver proxy message");
            break;
        }
    }
}
