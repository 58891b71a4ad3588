//! In-process [`Fetcher`] double for tests.
//!
//! Responses are scripted per path and every call is recorded, so tests can
//! assert on how many fetches a code path issued.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url, header};

use crate::fetch::{FetchResponse, Fetcher};
use offline_core::Error;

#[derive(Debug, Clone)]
enum Script {
    Respond { status: u16, body: Bytes, content_type: &'static str },
    Fail,
    Hang,
}

/// Fetcher that answers from a per-path script.
///
/// Paths without a script fail like an unreachable host.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `status` and `body` as `text/html`.
    pub fn respond(&self, path: &str, status: u16, body: impl Into<Bytes>) -> &Self {
        self.respond_with_type(path, status, body, "text/html")
    }

    pub fn respond_with_type(
        &self, path: &str, status: u16, body: impl Into<Bytes>, content_type: &'static str,
    ) -> &Self {
        self.lock_scripts()
            .insert(path.to_string(), Script::Respond { status, body: body.into(), content_type });
        self
    }

    /// Fail `path` with a connection error.
    pub fn fail(&self, path: &str) -> &Self {
        self.lock_scripts().insert(path.to_string(), Script::Fail);
        self
    }

    /// Never answer `path`.
    pub fn hang(&self, path: &str) -> &Self {
        self.lock_scripts().insert(path.to_string(), Script::Hang);
        self
    }

    /// Fail every request regardless of script.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap_or_else(|e| e.into_inner()) = offline;
    }

    /// Paths fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn lock_scripts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Script>> {
        self.scripts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let path = url.path().to_string();
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(path.clone());

        if *self.offline.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(Error::HttpError(format!("network error: {url} unreachable")));
        }

        let script = self.lock_scripts().get(&path).cloned();
        match script {
            Some(Script::Respond { status, body, content_type }) => {
                let status = StatusCode::from_u16(status).map_err(|e| Error::HttpError(e.to_string()))?;
                let mut headers = header::HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
                Ok(FetchResponse {
                    final_url: url.clone(),
                    status,
                    bytes: body,
                    headers,
                    fetch_ms: 0,
                })
            }
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail) | None => Err(Error::HttpError(format!("network error: connection refused ({url})"))),
        }
    }
}
