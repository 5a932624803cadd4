//! Configuration types for the cache manager and router
//!
//! Both structs are serde-friendly so the CLI can layer them from defaults,
//! a TOML file, and environment variables.

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One minute in milliseconds
const MINUTE_MS: u64 = 60 * 1000;

/// Where the durable tier keeps its entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    /// Single JSON file in the data directory
    #[default]
    File,
    /// SQLite database (requires the `database` feature)
    Sqlite,
}

/// Cache manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for documents of collections without an explicit entry
    pub default_ttl_ms: u64,
    /// TTL for cached list results, kept short since single-document
    /// invalidation does not reach lists
    pub list_ttl_ms: u64,
    /// Per-collection document TTL overrides
    pub collection_ttls: BTreeMap<String, u64>,
    /// Collections listed by `warm_cache`
    pub foundational_collections: Vec<String>,
    /// Byte quota for the session tier
    pub session_quota_bytes: u64,
    /// Byte quota for the durable tier
    pub durable_quota_bytes: u64,
    /// Share of durable entries dropped when the quota is hit
    pub eviction_fraction: f64,
    /// Durable tier backend
    pub durable_backend: DurableBackend,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let mut collection_ttls = BTreeMap::new();
        // Taxonomy barely changes
        collection_ttls.insert("mythologies".to_string(), 24 * 60 * MINUTE_MS);

        Self {
            default_ttl_ms: 5 * MINUTE_MS,
            list_ttl_ms: 2 * MINUTE_MS,
            collection_ttls,
            foundational_collections: vec!["mythologies".to_string()],
            session_quota_bytes: 5 * 1024 * 1024,
            durable_quota_bytes: 5 * 1024 * 1024,
            eviction_fraction: 0.1,
            durable_backend: DurableBackend::File,
        }
    }
}

impl CacheConfig {
    /// Create a test configuration with small quotas
    pub fn test() -> Self {
        Self {
            session_quota_bytes: 64 * 1024,
            durable_quota_bytes: 64 * 1024,
            ..Self::default()
        }
    }

    /// Check the configuration for values the cache cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_ms == 0 || self.list_ttl_ms == 0 {
            return Err(ValidationError::invalid_configuration("TTLs must be positive").into());
        }
        if let Some((name, _)) = self.collection_ttls.iter().find(|(_, ttl)| **ttl == 0) {
            return Err(ValidationError::invalid_configuration(&format!(
                "TTL for collection '{name}' must be positive"
            ))
            .into());
        }
        if !(self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0) {
            return Err(ValidationError::invalid_configuration(
                "eviction_fraction must be in (0, 1]",
            )
            .into());
        }
        Ok(())
    }
}

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of history entries kept
    pub max_history: usize,
    /// Require a signed-in user for every route except home
    pub require_login: bool,
    /// Collection searched when `/search` names none
    pub search_collection: String,
    /// Drop renders of navigations that were superseded while loading
    pub latest_navigation_wins: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            require_login: false,
            search_collection: "deities".to_string(),
            latest_navigation_wins: true,
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_history == 0 {
            return Err(ValidationError::invalid_configuration("max_history must be positive").into());
        }
        if self.search_collection.is_empty() {
            return Err(ValidationError::invalid_configuration(
                "search_collection must not be empty",
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
        assert!(CacheConfig::test().validate().is_ok());
    }

    #[test]
    fn test_taxonomy_outlives_entities() {
        let config = CacheConfig::default();
        assert!(config.collection_ttls["mythologies"] > config.default_ttl_ms);
        assert!(config.list_ttl_ms < config.default_ttl_ms);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = CacheConfig::default();
        config.collection_ttls.insert("herbs".to_string(), 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("herbs"));
    }

    #[test]
    fn test_eviction_fraction_bounds() {
        let mut config = CacheConfig::default();
        config.eviction_fraction = 0.0;
        assert!(config.validate().is_err());
        config.eviction_fraction = 1.5;
        assert!(config.validate().is_err());
        config.eviction_fraction = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"default_ttl_ms": 1000, "durable_backend": "sqlite"}"#)
                .unwrap();
        assert_eq!(config.default_ttl_ms, 1000);
        assert_eq!(config.durable_backend, DurableBackend::Sqlite);
        assert_eq!(config.foundational_collections, vec!["mythologies"]);
    }

    #[test]
    fn test_router_config_validation() {
        assert!(RouterConfig::default().validate().is_ok());
        let config = RouterConfig {
            max_history: 0,
            ..RouterConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
