//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    ProxyFetchParams, ProxyStatusParams, StatusUpdateParams,
    cache::{CacheGetParams, CacheStoresParams, get_impl, stores_impl},
    fetch_impl, status_impl, update_impl,
};

use offline_client::ProxyEngine;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for offline-proxy.
#[derive(Clone)]
pub struct OfflineProxyServer {
    tool_router: ToolRouter<Self>,
    engine: Arc<ProxyEngine>,
}

#[tool_router]
impl OfflineProxyServer {
    pub fn new(engine: Arc<ProxyEngine>) -> Self {
        Self { tool_router: Self::tool_router(), engine }
    }

    /// Route a request through the proxy.
    ///
    /// Same-origin requests go network-first and fall back to the current
    /// cache store; everything else is fetched directly.
    #[tool(
        description = "Fetch a URL (or a path on the proxy origin) through the offline proxy. Returns the response and whether it came from the network, the cache or passthrough."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Report the page's online and logged-in status. The latest report replaces the previous one.")]
    async fn status_update(&self, params: Parameters<StatusUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.engine, params.0).await
    }

    #[tool(description = "Show the proxy build version, lifecycle state, current cache store and status flags.")]
    async fn proxy_status(&self, params: Parameters<ProxyStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.engine, params.0).await
    }

    #[tool(description = "Look up the cached response for a path in the current (or a named) cache store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }

    #[tool(description = "List every cache store with its parsed build version and record count.")]
    async fn cache_stores(&self, params: Parameters<CacheStoresParams>) -> Result<CallToolResult, McpError> {
        stores_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for OfflineProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offline-proxy".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_logging().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::engine;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let (_fetcher, engine) = engine(&[]).await;
        let server = OfflineProxyServer::new(Arc::new(engine));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, vec!["cache_get", "cache_stores", "proxy_fetch", "proxy_status", "status_update"]);
    }

    #[tokio::test]
    async fn test_info_advertises_logging() {
        let (_fetcher, engine) = engine(&[]).await;
        let info = OfflineProxyServer::new(Arc::new(engine)).get_info();

        assert_eq!(info.server_info.name, "offline-proxy");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.logging.is_some());
    }
}
