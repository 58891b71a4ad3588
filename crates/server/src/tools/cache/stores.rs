//! cache_stores tool implementation.
//!
//! Lists every store in the database with its parsed build version.

use offline_client::ProxyEngine;
use offline_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_stores tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreEntry {
    pub name: String,
    /// Parsed build version; absent for names outside this app's scheme.
    pub version: Option<u64>,
    pub current: bool,
    pub records: usize,
}

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    pub stores: Vec<StoreEntry>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(engine: &ProxyEngine, _params: CacheStoresParams) -> Result<CallToolResult, McpError> {
    let cache = engine.cache();
    let current = engine.config().current_store_name();

    let mut stores = Vec::new();
    for name in cache.list_store_names().await? {
        let records = cache.db().store(&name).len().await?;
        stores.push(StoreEntry {
            version: cache.naming().parse_version(&name),
            current: name == current,
            records,
            name,
        });
    }

    let json = serde_json::to_string_pretty(&CacheStoresOutput { stores })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
