//! SQLite-backed versioned cache of response snapshots.
//!
//! This module provides persistent, namespaced response storage using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named stores, one per build version (`<app_id>-<version>`)
//! - Path-keyed records holding status, headers and body
//! - Automatic schema migrations
//! - WAL mode so several proxy instances can share one database file

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod records;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use names::StoreNaming;
pub use records::CacheRecord;
pub use stores::{CacheStore, VersionedCache};
