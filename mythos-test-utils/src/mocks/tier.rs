//! Tier stores that misbehave on purpose

use async_trait::async_trait;
use mythos_core::error::StorageError;
use mythos_core::{CacheEntry, CacheKey, Result, TierKind, TierStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How a [`FailingTier`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Every operation returns an I/O error
    Io,
    /// Reads report every present-looking key as corrupt; writes succeed
    CorruptReads,
    /// Writes always exceed the quota; eviction removes nothing
    QuotaExceeded,
}

/// Tier that fails every call in the configured way, counting attempts
#[derive(Clone)]
pub struct FailingTier {
    kind: TierKind,
    mode: FailureMode,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    evictions: Arc<AtomicUsize>,
}

impl FailingTier {
    pub fn new(kind: TierKind, mode: FailureMode) -> Self {
        Self {
            kind,
            mode,
            gets: Arc::default(),
            sets: Arc::default(),
            evictions: Arc::default(),
        }
    }

    pub fn get_attempts(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_attempts(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn eviction_attempts(&self) -> usize {
        self.evictions.load(Ordering::SeqCst)
    }

    fn io_error(&self) -> mythos_core::Error {
        StorageError::io(self.kind.name(), "injected failure").into()
    }
}

#[async_trait]
impl TierStore for FailingTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Io => Err(self.io_error()),
            FailureMode::CorruptReads => {
                Err(StorageError::corrupt(key.as_str(), "injected corruption").into())
            }
            FailureMode::QuotaExceeded => Ok(None),
        }
    }

    async fn set(&self, _key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Io => Err(self.io_error()),
            FailureMode::CorruptReads => Ok(()),
            FailureMode::QuotaExceeded => {
                Err(StorageError::quota_exceeded(self.kind.name(), 0, entry.size_bytes()).into())
            }
        }
    }

    async fn delete(&self, _key: &CacheKey) -> Result<()> {
        match self.mode {
            FailureMode::Io => Err(self.io_error()),
            _ => Ok(()),
        }
    }

    async fn delete_collection(&self, _collection: &str) -> Result<u64> {
        match self.mode {
            FailureMode::Io => Err(self.io_error()),
            _ => Ok(0),
        }
    }

    async fn clear_oldest_entries(&self, _fraction: f64) -> Result<u64> {
        self.evictions.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Io => Err(self.io_error()),
            _ => Ok(0),
        }
    }

    async fn clear(&self) -> Result<()> {
        match self.mode {
            FailureMode::Io => Err(self.io_error()),
            _ => Ok(()),
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
}
