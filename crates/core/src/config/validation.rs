//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `app_id` is empty or contains whitespace
    /// - `version` is 0 or does not fit in a signed 64-bit integer
    /// - a `manifest` entry does not start with `/` or appears twice
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(_) => {
                return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL".into() });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if self.app_id.is_empty() || self.app_id.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "app_id".into(),
                reason: "must be non-empty and contain no whitespace".into(),
            });
        }

        if self.version == 0 {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must be greater than 0".into() });
        }

        if i64::try_from(self.version).is_err() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: format!("must be at most {}", i64::MAX) });
        }

        let mut seen = HashSet::new();
        for path in &self.manifest {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "manifest".into(),
                    reason: format!("entry {path:?} must start with '/'"),
                });
            }
            if !seen.insert(path.as_str()) {
                return Err(ConfigError::Invalid { field: "manifest".into(), reason: format!("duplicate entry {path:?}") });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.manifest.is_empty() {
            tracing::warn!(app_id = %self.app_id, "manifest is empty; nothing will be pre-warmed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &AppConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_unparseable() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_origin_wrong_scheme() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("origin"));
    }

    #[test]
    fn test_validate_app_id_whitespace() {
        let config = AppConfig { app_id: "my app".into(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("app_id"));

        let config = AppConfig { app_id: String::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("app_id"));
    }

    #[test]
    fn test_validate_version_zero() {
        let config = AppConfig { version: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("version"));
    }

    #[test]
    fn test_validate_version_beyond_i64() {
        let config = AppConfig { version: i64::MAX as u64 + 1, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("version"));

        let config = AppConfig { version: i64::MAX as u64, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_manifest_relative_entry() {
        let config = AppConfig { manifest: vec!["about".into()], ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("manifest"));
    }

    #[test]
    fn test_validate_manifest_duplicate_entry() {
        let config = AppConfig { manifest: vec!["/a".into(), "/a".into()], ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("manifest"));
    }

    #[test]
    fn test_validate_empty_manifest_allowed() {
        let config = AppConfig { manifest: Vec::new(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("max_bytes"));

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() }; // 51MB
        assert_eq!(invalid_field(&config).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        assert_eq!(invalid_field(&config).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(invalid_field(&config).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, version: 1, ..Default::default() }; // minimum valid values
        assert!(config.validate().is_ok());

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
