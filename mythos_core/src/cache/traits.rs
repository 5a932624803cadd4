//! Cache tier trait definitions
//!
//! This module defines the TierStore trait every cache layer implements.

use crate::cache::{CacheEntry, CacheKey, TierKind};
use crate::error::Result;
use async_trait::async_trait;

/// A single layer of the cache hierarchy
///
/// Tiers store and return entries verbatim; freshness is decided by the
/// cache manager, which owns the clock.
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Which layer this store plays
    fn kind(&self) -> TierKind;

    /// Read an entry
    ///
    /// Returns `Ok(None)` when the key is absent. A decoding failure is an
    /// error; the manager treats it as a miss for this tier.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Store an entry, replacing any previous one
    ///
    /// Fails with `StorageError::QuotaExceeded` when the tier is full.
    async fn set(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()>;

    /// Remove one key; absent keys are not an error
    async fn delete(&self, key: &CacheKey) -> Result<()>;

    /// Remove every key in a collection's namespace, returning how many went
    async fn delete_collection(&self, collection: &str) -> Result<u64>;

    /// Drop the oldest entries by `storedAt`
    ///
    /// Removes `ceil(len * fraction)` entries, at least one when the tier is
    /// not empty, and returns the number removed.
    async fn clear_oldest_entries(&self, fraction: f64) -> Result<u64>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries
    async fn len(&self) -> Result<usize>;

    /// Release whatever backs this tier for good
    ///
    /// Called when the scope the tier belongs to ends (the session tier at
    /// session end). Defaults to clearing it.
    async fn discard(&self) -> Result<()> {
        self.clear().await
    }
}
