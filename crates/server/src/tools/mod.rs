//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offline-proxy server.

pub mod cache;
pub mod proxy_fetch;
pub mod status;

pub use proxy_fetch::{ProxyFetchParams, fetch_impl};
pub use status::{ProxyStatusParams, StatusUpdateParams, status_impl, update_impl};
