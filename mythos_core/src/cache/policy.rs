//! Per-collection TTL defaults

use crate::config::CacheConfig;
use std::collections::BTreeMap;

/// Chooses the TTL for an entry when the caller does not supply one
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    default_ttl_ms: u64,
    list_ttl_ms: u64,
    collection_ttls: BTreeMap<String, u64>,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default_ttl_ms: config.default_ttl_ms,
            list_ttl_ms: config.list_ttl_ms,
            collection_ttls: config.collection_ttls.clone(),
        }
    }

    /// TTL for a single document of `collection`
    pub fn document_ttl(&self, collection: &str) -> u64 {
        self.collection_ttls
            .get(collection)
            .copied()
            .unwrap_or(self.default_ttl_ms)
    }

    /// TTL for a list result of `collection`
    ///
    /// Lists are not reached by single-document invalidation, so they never
    /// live longer than the list TTL, even for long-lived collections.
    pub fn list_ttl(&self, collection: &str) -> u64 {
        self.document_ttl(collection).min(self.list_ttl_ms)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
