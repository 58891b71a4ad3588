//! cache_get tool implementation.
//!
//! Reports the cached record for a path in the current or a named store.

use offline_client::ProxyEngine;
use offline_core::{CacheRecord, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Resource path, e.g. `/about`.
    pub path: String,

    /// Store to read from. Defaults to the current build's store.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub path: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub body_sha256: String,
    pub fetched_at: String,
    /// False when the stored body no longer matches its digest.
    pub intact: bool,
}

impl CacheGetOutput {
    fn new(store: String, path: String, record: CacheRecord) -> Self {
        Self {
            store,
            path,
            status: record.status,
            content_type: record.content_type().map(str::to_string),
            intact: record.is_intact(),
            body_len: record.body.len(),
            headers: record.headers,
            body_sha256: record.body_sha256,
            fetched_at: record.fetched_at,
        }
    }
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &ProxyEngine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if !params.path.starts_with('/') {
        return Err(Error::InvalidInput(format!("path must start with '/': {}", params.path)).into());
    }

    let cache = engine.cache();
    let store_name = params.store.unwrap_or_else(|| engine.config().current_store_name());

    let record = cache
        .db()
        .store(&store_name)
        .get(&params.path)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{store_name}{}", params.path)))?;

    let output = CacheGetOutput::new(store_name, params.path, record);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize record: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{engine, output_json};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (_fetcher, engine) = engine(&[]).await;
        engine.start().await;

        let err = get_impl(&engine, CacheGetParams { path: "/nope".into(), store: None })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found_after_warm() {
        let (fetcher, engine) = engine(&["/about"]).await;
        fetcher.respond("/about", 200, "about");
        engine.start().await;

        let result = get_impl(&engine, CacheGetParams { path: "/about".into(), store: None })
            .await
            .unwrap();

        let json = output_json(&result);
        assert_eq!(json["store"], "app-5");
        assert_eq!(json["status"], 200);
        assert_eq!(json["content_type"], "text/html");
        assert_eq!(json["body_len"], 5);
        assert_eq!(json["intact"], true);
    }

    #[tokio::test]
    async fn test_get_impl_unknown_store_is_not_created() {
        let (_fetcher, engine) = engine(&[]).await;

        let result = get_impl(&engine, CacheGetParams { path: "/".into(), store: Some("app-1".into()) }).await;

        assert!(result.is_err());
        assert!(engine.cache().list_store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_after_gc_does_not_restore_stale_store() {
        let (fetcher, engine) = engine(&["/"]).await;
        fetcher.respond("/", 200, "home");
        engine
            .cache()
            .open(4)
            .await
            .unwrap()
            .put("/", &CacheRecord::new(200, Vec::new(), b"old".to_vec()))
            .await
            .unwrap();

        engine.start().await;
        let result = get_impl(&engine, CacheGetParams { path: "/".into(), store: Some("app-4".into()) }).await;

        assert_eq!(result.unwrap_err().code.0, -32001);
        assert_eq!(engine.cache().list_store_names().await.unwrap(), vec!["app-5".to_string()]);
    }

    #[tokio::test]
    async fn test_get_impl_rejects_relative_path() {
        let (_fetcher, engine) = engine(&[]).await;
        let err = get_impl(&engine, CacheGetParams { path: "about".into(), store: None })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
