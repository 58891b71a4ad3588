//! Cache inspection tools.

pub mod get;
pub mod stores;

pub use get::{CacheGetParams, get_impl};
pub use stores::{CacheStoresParams, stores_impl};
