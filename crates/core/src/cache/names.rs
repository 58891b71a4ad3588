//! Store naming scheme: `<app_id>-<version>`.
//!
//! Garbage collection is split into a pure scan over store names
//! ([`StoreNaming::stale_names`]) and a separate delete phase, so the
//! selection rules can be tested without a database.

use regex::Regex;

use crate::Error;

/// Format the store name for an app id and build version.
pub fn format_store_name(app_id: &str, version: u64) -> String {
    format!("{app_id}-{version}")
}

/// Naming scheme for one application's versioned stores.
#[derive(Debug, Clone)]
pub struct StoreNaming {
    app_id: String,
    pattern: Regex,
}

impl StoreNaming {
    /// Build the naming scheme for `app_id`.
    pub fn new(app_id: impl Into<String>) -> Result<Self, Error> {
        let app_id = app_id.into();
        if app_id.is_empty() {
            return Err(Error::InvalidInput("app id cannot be empty".into()));
        }
        let pattern = Regex::new(&format!("^{}-([0-9]+)$", regex::escape(&app_id)))
            .map_err(|e| Error::InvalidInput(format!("invalid app id {app_id:?}: {e}")))?;
        Ok(Self { app_id, pattern })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn format(&self, version: u64) -> String {
        format_store_name(&self.app_id, version)
    }

    /// Extract the version embedded in a store name.
    ///
    /// Returns `None` for names outside this scheme, including names whose
    /// digits do not fit in a `u64`.
    pub fn parse_version(&self, name: &str) -> Option<u64> {
        let caps = self.pattern.captures(name)?;
        caps.get(1)?.as_str().parse().ok()
    }

    /// Names of stores that belong to this scheme but to another version.
    ///
    /// Version 0 counts as absent, so `<app_id>-0` is never selected.
    pub fn stale_names<'a>(&self, names: impl IntoIterator<Item = &'a str>, current: u64) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| matches!(self.parse_version(name), Some(v) if v != 0 && v != current))
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> StoreNaming {
        StoreNaming::new("app").unwrap()
    }

    #[test]
    fn test_format() {
        assert_eq!(naming().format(5), "app-5");
        assert_eq!(format_store_name("docs", 12), "docs-12");
    }

    #[test]
    fn test_parse_version() {
        let naming = naming();
        assert_eq!(naming.parse_version("app-4"), Some(4));
        assert_eq!(naming.parse_version("app-0"), Some(0));
        assert_eq!(naming.parse_version("app-unrelatedname"), None);
        assert_eq!(naming.parse_version("app-"), None);
        assert_eq!(naming.parse_version("app-4a"), None);
        assert_eq!(naming.parse_version("other-4"), None);
        assert_eq!(naming.parse_version("xapp-4"), None);
    }

    #[test]
    fn test_parse_version_overflow_is_unparseable() {
        assert_eq!(naming().parse_version("app-99999999999999999999999"), None);
    }

    #[test]
    fn test_app_id_with_regex_metacharacters() {
        let naming = StoreNaming::new("my.app").unwrap();
        assert_eq!(naming.parse_version("my.app-3"), Some(3));
        assert_eq!(naming.parse_version("myxapp-3"), None);
    }

    #[test]
    fn test_app_id_with_hyphen() {
        let naming = StoreNaming::new("offline-proxy").unwrap();
        assert_eq!(naming.parse_version("offline-proxy-2"), Some(2));
        assert_eq!(naming.parse_version("offline-2"), None);
    }

    #[test]
    fn test_empty_app_id_rejected() {
        assert!(matches!(StoreNaming::new(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_stale_names() {
        let names = ["app-3", "app-4", "app-5", "app-unrelatedname", "other-1"];
        let stale = naming().stale_names(names, 5);
        assert_eq!(stale, vec!["app-3".to_string(), "app-4".to_string()]);
    }

    #[test]
    fn test_stale_names_keeps_version_zero() {
        let stale = naming().stale_names(["app-0", "app-00", "app-4", "app-5"], 5);
        assert_eq!(stale, vec!["app-4".to_string()]);
    }

    #[test]
    fn test_stale_names_none_when_only_current() {
        assert!(naming().stale_names(["app-5"], 5).is_empty());
    }
}
