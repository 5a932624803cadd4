//! File-based tier implementation
//!
//! This module persists a tier's entries to a single JSON file, keyed by the
//! textual cache key. It backs the session tier (one file per session) and
//! the default durable tier.

use crate::cache::traits::TierStore;
use crate::cache::{CacheEntry, CacheKey, TierKind, oldest_keys};
use crate::error::{Result, StorageError, ValidationError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Raw serialized entries; decoded lazily so one bad entry only costs a miss
    entries: HashMap<String, Value>,
    used_bytes: u64,
}

/// JSON-file backed cache tier
pub struct FileTier {
    kind: TierKind,
    path: PathBuf,
    quota_bytes: Option<u64>,
    inner: RwLock<Inner>,
}

impl FileTier {
    /// Open (or create) a tier stored at `path`
    pub fn open(kind: TierKind, path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::io(
                    kind.name(),
                    format!("Failed to create cache directory {}: {e}", parent.display()),
                )
            })?;
        }

        let entries = match Self::load_from_disk(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Discarding unreadable {kind} tier file: {e}");
                HashMap::new()
            }
        };
        let used_bytes = Self::total_size(&entries);

        Ok(Self {
            kind,
            path,
            quota_bytes: None,
            inner: RwLock::new(Inner {
                entries,
                used_bytes,
            }),
        })
    }

    /// Open the session tier for `session_id` under `dir`
    ///
    /// The name must be a single path component.
    pub fn session(dir: &Path, session_id: &str) -> Result<Self> {
        if session_id.is_empty()
            || session_id == "."
            || session_id == ".."
            || session_id.contains(['/', '\\'])
        {
            return Err(ValidationError::invalid_identifier("session", session_id).into());
        }
        Self::open(TierKind::Session, dir.join(format!("{session_id}.json")))
    }

    /// Open the durable tier at `path`
    pub fn durable(path: PathBuf) -> Result<Self> {
        Self::open(TierKind::Durable, path)
    }

    /// Limit the total serialized size of stored entries
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Backing file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn slot_size(raw: &str, value: &Value) -> u64 {
        raw.len() as u64 + serde_json::to_vec(value).map_or(0, |bytes| bytes.len() as u64)
    }

    fn total_size(entries: &HashMap<String, Value>) -> u64 {
        entries
            .iter()
            .map(|(raw, value)| Self::slot_size(raw, value))
            .sum()
    }

    /// Persist `entries`, then make them the live state
    ///
    /// The in-memory state is left untouched when the file cannot be written.
    async fn commit(&self, inner: &mut Inner, entries: HashMap<String, Value>) -> Result<()> {
        self.save_to_disk(&entries).await?;
        inner.used_bytes = Self::total_size(&entries);
        inner.entries = entries;
        Ok(())
    }

    fn load_from_disk(path: &Path) -> Result<HashMap<String, Value>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| StorageError::io("file", format!("Failed to read cache: {e}")))?;

        let entries: HashMap<String, Value> = serde_json::from_str(&data)
            .map_err(|e| StorageError::corrupt(&path.display().to_string(), e.to_string()))?;

        Ok(entries)
    }

    async fn save_to_disk(&self, entries: &HashMap<String, Value>) -> Result<()> {
        let io_err =
            |what: &str, e: std::io::Error| StorageError::io(self.kind.name(), format!("{what}: {e}"));

        let data = serde_json::to_vec(entries).map_err(|e| {
            StorageError::io(self.kind.name(), format!("Failed to serialize cache: {e}"))
        })?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| io_err("Failed to create cache file", e))?;
        file.write_all(&data)
            .await
            .map_err(|e| io_err("Failed to write cache", e))?;
        file.flush()
            .await
            .map_err(|e| io_err("Failed to flush cache", e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_err("Failed to replace cache file", e))?;
        Ok(())
    }
}

#[async_trait]
impl TierStore for FileTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let inner = self.inner.read().await;
        match inner.entries.get(key.as_str()) {
            Some(raw) => serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(|e| StorageError::corrupt(key.as_str(), e.to_string()).into()),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let mut inner = self.inner.write().await;

        let value = serde_json::to_value(entry)?;
        let size = Self::slot_size(key.as_str(), &value);
        let replaced = inner
            .entries
            .get(key.as_str())
            .map_or(0, |old| Self::slot_size(key.as_str(), old));
        let required = inner.used_bytes.saturating_sub(replaced) + size;

        if let Some(quota) = self.quota_bytes
            && required > quota
        {
            return Err(StorageError::quota_exceeded(self.kind.name(), quota, required).into());
        }

        let mut entries = inner.entries.clone();
        entries.insert(key.as_str().to_string(), value);
        self.commit(&mut inner, entries).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        let mut inner = self.inner.write().await;

        if !inner.entries.contains_key(key.as_str()) {
            return Ok(());
        }

        let mut entries = inner.entries.clone();
        entries.remove(key.as_str());
        self.commit(&mut inner, entries).await
    }

    async fn delete_collection(&self, collection: &str) -> Result<u64> {
        let mut inner = self.inner.write().await;

        let entries: HashMap<String, Value> = inner
            .entries
            .iter()
            .filter(|(raw, _)| !CacheKey::in_namespace(raw, collection))
            .map(|(raw, value)| (raw.clone(), value.clone()))
            .collect();
        let removed = (inner.entries.len() - entries.len()) as u64;

        if removed > 0 {
            self.commit(&mut inner, entries).await?;
        }

        Ok(removed)
    }

    async fn clear_oldest_entries(&self, fraction: f64) -> Result<u64> {
        let mut inner = self.inner.write().await;

        // Undecodable entries count as oldest
        let ages: Vec<(String, i64)> = inner
            .entries
            .iter()
            .map(|(raw, value)| {
                let stored_at = value
                    .get("storedAt")
                    .and_then(Value::as_i64)
                    .unwrap_or(i64::MIN);
                (raw.clone(), stored_at)
            })
            .collect();
        let doomed = oldest_keys(ages.iter().map(|(raw, at)| (raw, *at)), fraction);

        if doomed.is_empty() {
            return Ok(0);
        }

        let mut entries = inner.entries.clone();
        for raw in &doomed {
            entries.remove(raw);
        }
        self.commit(&mut inner, entries).await?;
        Ok(doomed.len() as u64)
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;

        self.commit(&mut inner, HashMap::new()).await
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.entries.len())
    }

    async fn discard(&self) -> Result<()> {
        let mut inner = self.inner.write().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::io(
                    self.kind.name(),
                    format!("Failed to remove {}: {e}", self.path.display()),
                )
                .into());
            }
        }

        inner.entries.clear();
        inner.used_bytes = 0;
        Ok(())
    }
}
