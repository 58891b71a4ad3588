//! Client side of the offline proxy.
//!
//! This crate provides the HTTP fetch pipeline and the interception engine
//! (pre-warming, routing, lifecycle) built on the stores in `offline-core`.

pub mod fetch;
pub mod proxy;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};
pub use proxy::{
    InterceptionRouter, LifecycleController, LifecycleState, PreloadWarmer, ProxyEngine, Routed, StartReport, WarmReport,
};
