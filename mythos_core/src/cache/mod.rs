//! Tiered document cache
//!
//! Reads go memory → session → durable → remote store. Every tier speaks the
//! [`TierStore`] trait; the [`CacheManager`] owns all three and is the only
//! writer.

use crate::error::{Result, ValidationError};
use crate::store::Filters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

mod locks;

pub mod factory;
pub mod file_tier;
pub mod manager;
pub mod memory_tier;
pub mod metrics;
pub mod policy;
#[cfg(feature = "database")]
pub mod sqlite_tier;
pub mod traits;

pub use factory::{TierPaths, TierSet};
pub use file_tier::FileTier;
pub use manager::{CacheManager, GetOptions, QueryOptions, SetOptions};
pub use memory_tier::MemoryTier;
pub use metrics::{CacheMetrics, CacheStats};
pub use policy::TtlPolicy;
#[cfg(feature = "database")]
pub use sqlite_tier::SqliteTier;
pub use traits::TierStore;

/// Prefix shared by every persisted key
const KEY_PREFIX: &str = "cache_";

/// Cache layer identity, fastest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TierKind {
    Memory,
    Session,
    Durable,
}

impl TierKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Session => "session",
            Self::Durable => "durable",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage key for a document or a list query
///
/// Textual forms:
/// - `cache_<collection>:<id>`
/// - `cache_<collection>:list:<canonical filters>:<limit|all>`
///
/// Identifiers may not contain `:` or whitespace, which keeps
/// `cache_<collection>:` an unambiguous namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    collection: String,
    key: String,
}

impl CacheKey {
    /// Key for a single document
    pub fn document(collection: &str, id: &str) -> Result<Self> {
        validate_identifier("collection", collection)?;
        validate_identifier("document id", id)?;
        Ok(Self {
            collection: collection.to_string(),
            key: format!("{}{id}", Self::namespace(collection)),
        })
    }

    /// Key for a filtered list query
    pub fn list(collection: &str, filters: &Filters, limit: Option<usize>) -> Result<Self> {
        validate_identifier("collection", collection)?;
        let limit = limit.map_or_else(|| "all".to_string(), |n| n.to_string());
        Ok(Self {
            collection: collection.to_string(),
            key: format!(
                "{}list:{}:{limit}",
                Self::namespace(collection),
                filters.canonical()
            ),
        })
    }

    /// Namespace prefix covering every key of a collection
    pub fn namespace(collection: &str) -> String {
        format!("{KEY_PREFIX}{collection}:")
    }

    /// Check whether a raw key belongs to a collection's namespace
    pub fn in_namespace(raw: &str, collection: &str) -> bool {
        raw.starts_with(&Self::namespace(collection))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn validate_identifier(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains(':') || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_identifier(kind, value).into());
    }
    Ok(())
}

/// Cached payload with its freshness window
///
/// Entries never change after construction; a refresh stores a new entry.
/// Serialized as `{ "data", "storedAt", "ttl" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    data: Value,
    stored_at: i64,
    ttl: u64,
}

impl CacheEntry {
    /// Create an entry stored at `stored_at` (epoch ms) living `ttl` ms
    pub fn new(data: Value, stored_at: i64, ttl: u64) -> Self {
        Self {
            data,
            stored_at,
            ttl,
        }
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    pub fn stored_at(&self) -> i64 {
        self.stored_at
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    /// Fresh iff `now - storedAt < ttl`
    pub fn is_fresh(&self, now: i64) -> bool {
        let age = now.saturating_sub(self.stored_at);
        age < i64::try_from(self.ttl).unwrap_or(i64::MAX)
    }

    /// Serialized size, used for quota accounting
    pub fn size_bytes(&self) -> u64 {
        serde_json::to_vec(self).map_or(0, |bytes| bytes.len() as u64)
    }
}

/// Pick the `fraction` oldest keys by `storedAt`, at least one when any exist
pub(crate) fn oldest_keys<'a, I>(entries: I, fraction: f64) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, i64)>,
{
    let mut by_age: Vec<(i64, &String)> = entries.into_iter().map(|(k, at)| (at, k)).collect();
    if by_age.is_empty() {
        return Vec::new();
    }
    by_age.sort();
    let count = ((by_age.len() as f64) * fraction).ceil().max(1.0) as usize;
    by_age
        .into_iter()
        .take(count)
        .map(|(_, key)| key.clone())
        .collect()
}
