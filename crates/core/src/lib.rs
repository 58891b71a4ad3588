//! Core types and shared functionality for offline-proxy.
//!
//! This crate provides:
//! - Versioned response cache with SQLite backend
//! - Status channel types and the context registry
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod contexts;
pub mod error;
pub mod manifest;
pub mod status;

pub use cache::{CacheDb, CacheRecord, CacheStore, StoreNaming, VersionedCache};
pub use config::{AppConfig, BUILD_VERSION, ConfigError};
pub use contexts::{ContextId, ContextInfo, ContextRegistry};
pub use error::Error;
pub use manifest::Manifest;
pub use status::{ProxyMessage, ProxyStatus, SharedStatus, StatusSync};
