//! status_update and proxy_status tool implementations.

use offline_client::ProxyEngine;
use offline_core::{Error, ProxyMessage, ProxyStatus};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the status_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusUpdateParams {
    pub is_online: bool,
    pub is_logged_in: bool,
}

/// Parameters for the proxy_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProxyStatusParams {}

/// Output from the proxy_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyStatusOutput {
    pub version: u64,
    pub state: String,
    pub current_store: String,
    pub status: ProxyStatus,
    pub contexts: usize,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Apply a status report from a context; the latest report wins.
pub async fn update_impl(engine: &ProxyEngine, params: StatusUpdateParams) -> Result<CallToolResult, McpError> {
    let status = ProxyStatus { is_online: params.is_online, is_logged_in: params.is_logged_in };
    engine.status_sync().receive(ProxyMessage::StatusUpdate(status)).await;
    to_result(&engine.status_sync().status().get().await)
}

pub async fn status_impl(engine: &ProxyEngine, _params: ProxyStatusParams) -> Result<CallToolResult, McpError> {
    let output = ProxyStatusOutput {
        version: engine.config().version,
        state: engine.lifecycle().state().as_str().to_string(),
        current_store: engine.config().current_store_name(),
        status: engine.status_sync().status().get().await,
        contexts: engine.contexts().len().await,
    };
    to_result(&output)
}
