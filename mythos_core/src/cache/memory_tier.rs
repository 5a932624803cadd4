//! Memory-based tier implementation
//!
//! This module provides the process-memory layer. It can also stand in for
//! the persistent layers in tests, optionally with a byte quota.

use crate::cache::traits::TierStore;
use crate::cache::{CacheEntry, CacheKey, TierKind, oldest_keys};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Slot {
    entry: CacheEntry,
    size: u64,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    used_bytes: u64,
}

/// Keyed in-process map of cache entries
pub struct MemoryTier {
    kind: TierKind,
    quota_bytes: Option<u64>,
    inner: RwLock<Inner>,
}

impl MemoryTier {
    /// Create an unbounded process-memory tier
    pub fn new() -> Self {
        Self::with_kind(TierKind::Memory)
    }

    /// Create an in-memory store playing another layer's role
    pub fn with_kind(kind: TierKind) -> Self {
        Self {
            kind,
            quota_bytes: None,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Limit the total serialized size of stored entries
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Bytes currently accounted against the quota
    pub async fn used_bytes(&self) -> u64 {
        self.inner.read().await.used_bytes
    }
}

#[async_trait]
impl TierStore for MemoryTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.slots.get(key.as_str()).map(|slot| slot.entry.clone()))
    }

    async fn set(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let mut inner = self.inner.write().await;

        let size = key.as_str().len() as u64 + entry.size_bytes();
        let replaced = inner.slots.get(key.as_str()).map_or(0, |slot| slot.size);
        let required = inner.used_bytes.saturating_sub(replaced) + size;

        if let Some(quota) = self.quota_bytes
            && required > quota
        {
            return Err(StorageError::quota_exceeded(self.kind.name(), quota, required).into());
        }

        inner.slots.insert(
            key.as_str().to_string(),
            Slot {
                entry: entry.clone(),
                size,
            },
        );
        inner.used_bytes = required;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.slots.remove(key.as_str()) {
            inner.used_bytes = inner.used_bytes.saturating_sub(slot.size);
        }
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let doomed: Vec<String> = inner
            .slots
            .keys()
            .filter(|raw| CacheKey::in_namespace(raw, collection))
            .cloned()
            .collect();

        for raw in &doomed {
            if let Some(slot) = inner.slots.remove(raw) {
                inner.used_bytes = inner.used_bytes.saturating_sub(slot.size);
            }
        }
        Ok(doomed.len() as u64)
    }

    async fn clear_oldest_entries(&self, fraction: f64) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let doomed = oldest_keys(
            inner
                .slots
                .iter()
                .map(|(raw, slot)| (raw, slot.entry.stored_at())),
            fraction,
        );

        for raw in &doomed {
            if let Some(slot) = inner.slots.remove(raw) {
                inner.used_bytes = inner.used_bytes.saturating_sub(slot.size);
            }
        }
        Ok(doomed.len() as u64)
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.slots.clear();
        inner.used_bytes = 0;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.slots.len())
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}
