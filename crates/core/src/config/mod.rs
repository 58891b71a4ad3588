//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFLINE_PROXY_*)
//! 2. TOML config file (if OFFLINE_PROXY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

mod validation;

pub use validation::ConfigError;

/// Cache build version compiled into this binary.
///
/// Bump whenever the pre-warmed shell changes so that activation replaces
/// the stores written by older builds.
pub const BUILD_VERSION: u64 = 5;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFLINE_PROXY_*)
/// 2. TOML config file (if OFFLINE_PROXY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database shared by every proxy instance.
    ///
    /// Set via OFFLINE_PROXY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin whose requests are intercepted (scheme, host and port).
    ///
    /// Set via OFFLINE_PROXY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Application id used as the store name prefix (`<app_id>-<version>`).
    ///
    /// Set via OFFLINE_PROXY_APP_ID environment variable.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Cache build version of this instance.
    ///
    /// Set via OFFLINE_PROXY_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: u64,

    /// Resource paths pre-warmed into the current store.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFLINE_PROXY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OFFLINE_PROXY_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via OFFLINE_PROXY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offline-proxy-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8049".into()
}

fn default_app_id() -> String {
    "app".into()
}

fn default_version() -> u64 {
    BUILD_VERSION
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/about",
        "/contact",
        "/404",
        "/login",
        "/offline",
        "/css/style.css",
        "/js/blog.js",
        "/js/home.js",
        "/js/login.js",
        "/js/add-post.js",
        "/images/logo.gif",
        "/images/offline.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    "offline-proxy/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            app_id: default_app_id(),
            version: default_version(),
            manifest: default_manifest(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Manifest as an ordered, de-duplicated set of resource keys.
    pub fn manifest(&self) -> Manifest {
        Manifest::new(self.manifest.iter().cloned())
    }

    /// Name of the store owned by this build.
    pub fn current_store_name(&self) -> String {
        crate::cache::names::format_store_name(&self.app_id, self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFLINE_PROXY_`
    /// 2. TOML file from `OFFLINE_PROXY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFLINE_PROXY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFLINE_PROXY_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./offline-proxy-cache.sqlite"));
        assert_eq!(config.origin, "http://localhost:8049");
        assert_eq!(config.app_id, "app");
        assert_eq!(config.version, BUILD_VERSION);
        assert_eq!(config.user_agent, "offline-proxy/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.manifest.len(), 13);
        assert_eq!(config.manifest[0], "/");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_current_store_name() {
        let config = AppConfig { app_id: "docs".into(), version: 7, ..Default::default() };
        assert_eq!(config.current_store_name(), "docs-7");
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("OFFLINE_PROXY_APP_ID", "docs");
            jail.set_env("OFFLINE_PROXY_VERSION", "9");
            jail.set_env("OFFLINE_PROXY_ORIGIN", "https://docs.example.com");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.app_id, "docs");
            assert_eq!(config.version, 9);
            assert_eq!(config.origin, "https://docs.example.com");
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "proxy.toml",
                r#"
                    app_id = "site"
                    manifest = ["/", "/offline"]
                "#,
            )?;
            jail.set_env("OFFLINE_PROXY_CONFIG_FILE", "proxy.toml");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.app_id, "site");
            assert_eq!(config.manifest, vec!["/".to_string(), "/offline".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("OFFLINE_PROXY_VERSION", "0");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
