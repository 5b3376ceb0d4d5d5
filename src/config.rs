use anyhow::{Result, anyhow};
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

/// Connection settings for the Notion database, read once at startup.
#[derive(Clone)]
pub struct SyncConfig {
    pub database_id: String,
    pub api_key: String,
    pub base_url: String,
    pub notion_version: String,
}

impl SyncConfig {
    /// Reads `DATABASE_ID`, `API_KEY`, `NOTION_BASE_URL` and `NOTION_VERSION` from the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        Ok(Self {
            database_id: required("DATABASE_ID")?,
            api_key: required("API_KEY")?,
            base_url: lookup("NOTION_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            notion_version: lookup("NOTION_VERSION")
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
        })
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("database_id", &self.database_id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("notion_version", &self.notion_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            SyncConfig::from_lookup(lookup(&[("DATABASE_ID", "db1"), ("API_KEY", "secret")]))
                .unwrap();

        assert_eq!(config.database_id, "db1");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.notion_version, DEFAULT_NOTION_VERSION);
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("DATABASE_ID", "db1"),
            ("API_KEY", "secret"),
            ("NOTION_BASE_URL", "http://localhost:9000/"),
            ("NOTION_VERSION", "2025-09-03"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.notion_version, "2025-09-03");
    }

    #[test]
    fn test_missing_database_id() {
        let err = SyncConfig::from_lookup(lookup(&[("API_KEY", "secret")])).unwrap_err();
        assert_eq!(err.to_string(), "DATABASE_ID must be set");
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let err = SyncConfig::from_lookup(lookup(&[("DATABASE_ID", "db1"), ("API_KEY", "  ")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "API_KEY must be set");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config =
            SyncConfig::from_lookup(lookup(&[("DATABASE_ID", "db1"), ("API_KEY", "secret")]))
                .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
