//! proxy_fetch tool implementation.
//!
//! Routes one request through the proxy engine exactly as an intercepted
//! page request would be routed.

use offline_client::{
    ProxyEngine, Routed,
    fetch::{FetchResponse, canonicalize, resolve_key},
};
use offline_core::{CacheRecord, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Parameters for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL, or a path resolved against the proxy origin.
    pub url: String,
}

/// Where the response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Passthrough,
}

/// Output from the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    pub url: String,
    /// URL the response was served from after redirects. Absent for cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    /// Network time in milliseconds. Absent for cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_ms: Option<u64>,
    pub source: ResponseSource,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_len: usize,
    pub body_sha256: String,
    /// Whether a network response was snapshotted. Absent for other sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<bool>,
}

impl ProxyFetchOutput {
    fn from_record(url: &Url, source: ResponseSource, record: CacheRecord, stored: Option<bool>) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            fetch_ms: None,
            source,
            status: record.status,
            body_len: record.body.len(),
            body: String::from_utf8_lossy(&record.body).into_owned(),
            headers: record.headers,
            body_sha256: record.body_sha256,
            stored,
        }
    }

    fn from_response(url: &Url, source: ResponseSource, response: &FetchResponse, stored: Option<bool>) -> Self {
        Self {
            final_url: Some(response.final_url.to_string()),
            fetch_ms: Some(response.fetch_ms),
            ..Self::from_record(url, source, response.to_record(), stored)
        }
    }
}

fn parse_target(engine: &ProxyEngine, raw: &str) -> Result<Url, Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }
    if raw.starts_with('/') {
        return Ok(resolve_key(engine.origin(), raw)?);
    }
    Ok(canonicalize(raw)?)
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(engine: &ProxyEngine, params: ProxyFetchParams) -> Result<CallToolResult, McpError> {
    let url = parse_target(engine, &params.url)?;

    let output = match engine.handle(&url).await {
        Routed::Network { response, stored } => {
            ProxyFetchOutput::from_response(&url, ResponseSource::Network, &response, Some(stored))
        }
        Routed::Cache(record) => ProxyFetchOutput::from_record(&url, ResponseSource::Cache, record, None),
        Routed::Passthrough => {
            let response = engine.passthrough(&url).await?;
            ProxyFetchOutput::from_response(&url, ResponseSource::Passthrough, &response, None)
        }
        Routed::Unhandled => return Err(Error::NoResponse(url.to_string()).into()),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
