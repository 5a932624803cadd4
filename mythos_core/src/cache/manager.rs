//! Tiered cache manager
//!
//! Serves document and list reads for named collections from the fastest
//! tier holding a fresh entry, falling back to the remote document store and
//! writing results through every tier.
//!
//! Lists are cached as a unit under their own key. Invalidating a single
//! document does **not** invalidate cached lists that contain it; list TTLs
//! are kept short to bound that staleness. Invalidate the whole collection
//! when a change must be reflected in lists immediately.

use crate::cache::factory::TierSet;
use crate::cache::locks::KeyLocks;
use crate::cache::metrics::{CacheMetrics, CacheStats};
use crate::cache::policy::TtlPolicy;
use crate::cache::traits::TierStore;
use crate::cache::{CacheEntry, CacheKey, TierKind};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{Result, StoreError, ValidationError};
use crate::store::{DocumentStore, Filters};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Options for [`CacheManager::get`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// TTL in ms for the entry written by this call
    pub ttl: Option<u64>,
    /// Skip the tiers and go straight to the store
    pub force_refresh: bool,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl_ms: u64) -> Self {
        self.ttl = Some(ttl_ms);
        self
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

/// Options for [`CacheManager::get_list`]
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Maximum number of documents returned
    pub limit: Option<usize>,
    /// TTL in ms for the list entry written by this call
    pub ttl: Option<u64>,
    /// Skip the tiers and go straight to the store
    pub force_refresh: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_ttl(mut self, ttl_ms: u64) -> Self {
        self.ttl = Some(ttl_ms);
        self
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

/// Options for [`CacheManager::set`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// TTL in ms; defaults to the collection's document TTL
    pub ttl: Option<u64>,
}

/// Multi-tier cache in front of a remote document store
///
/// Construct one per application and share it behind an `Arc`.
pub struct CacheManager {
    store: Arc<dyn DocumentStore>,
    tiers: Vec<Arc<dyn TierStore>>,
    policy: TtlPolicy,
    metrics: CacheMetrics,
    clock: Arc<dyn Clock>,
    locks: KeyLocks,
    config: CacheConfig,
}

impl CacheManager {
    /// Create a cache manager over `tiers`
    pub fn new(store: Arc<dyn DocumentStore>, tiers: TierSet, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            tiers: tiers.ordered(),
            policy: TtlPolicy::from_config(&config),
            metrics: CacheMetrics::new(),
            clock: Arc::new(SystemClock),
            locks: KeyLocks::default(),
            config,
        })
    }

    /// Create a cache manager with in-memory tiers and default configuration
    pub fn in_memory(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            tiers: TierSet::in_memory().ordered(),
            policy: TtlPolicy::default(),
            metrics: CacheMetrics::new(),
            clock: Arc::new(SystemClock),
            locks: KeyLocks::default(),
            config: CacheConfig::default(),
        }
    }

    /// Replace the clock used for timestamps and freshness
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The tier playing `kind`
    pub fn tier(&self, kind: TierKind) -> Option<&Arc<dyn TierStore>> {
        self.tiers.iter().find(|tier| tier.kind() == kind)
    }

    /// Read one document
    ///
    /// Returns `Ok(None)` when the store confirms the document does not
    /// exist; that answer is not cached. Store failures surface as
    /// `Error::Store`.
    pub async fn get(&self, collection: &str, id: &str, options: GetOptions) -> Result<Option<Value>> {
        let started = Instant::now();
        let key = CacheKey::document(collection, id)?;
        let ttl = Self::checked_ttl(options.ttl, || self.policy.document_ttl(collection))?;

        let store = &self.store;
        let result = self
            .read_through(&key, ttl, options.force_refresh, || async move {
                Ok(store.fetch_document(collection, id).await?.into_data())
            })
            .await;

        if result.is_ok() {
            self.metrics.record_response(started.elapsed());
        }
        result
    }

    /// Read one document and deserialize it
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        options: GetOptions,
    ) -> Result<Option<T>> {
        match self.get(collection, id, options).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::malformed(collection, id, e.to_string()).into()),
            None => Ok(None),
        }
    }

    /// Read the documents of `collection` matching every filter
    pub async fn get_list(
        &self,
        collection: &str,
        filters: &Filters,
        options: QueryOptions,
    ) -> Result<Vec<Value>> {
        let started = Instant::now();
        let key = CacheKey::list(collection, filters, options.limit)?;
        let ttl = Self::checked_ttl(options.ttl, || self.policy.list_ttl(collection))?;

        let store = &self.store;
        let limit = options.limit;
        let result = self
            .read_through(&key, ttl, options.force_refresh, || async move {
                let documents = store.fetch_list(collection, filters, limit).await?;
                Ok(Some(Value::Array(documents)))
            })
            .await;

        let documents = match result? {
            Some(Value::Array(documents)) => documents,
            Some(other) => {
                return Err(
                    StoreError::malformed(collection, "list", format!("expected array, got {other}"))
                        .into(),
                );
            }
            None => Vec::new(),
        };
        self.metrics.record_response(started.elapsed());
        Ok(documents)
    }

    /// Write a document into every tier
    pub async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        options: SetOptions,
    ) -> Result<()> {
        let key = CacheKey::document(collection, id)?;
        let ttl = Self::checked_ttl(options.ttl, || self.policy.document_ttl(collection))?;
        let entry = CacheEntry::new(data, self.clock.now_millis(), ttl);
        self.write_through(&key, &entry).await;
        Ok(())
    }

    /// Remove one document, or with `id = None` the whole collection, from
    /// every tier
    pub async fn invalidate(&self, collection: &str, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => {
                let key = CacheKey::document(collection, id)?;
                for tier in &self.tiers {
                    if let Err(e) = tier.delete(&key).await {
                        log::warn!("Failed to invalidate {key} in {} tier: {e}", tier.kind());
                    }
                }
                log::debug!("Invalidated {key}");
            }
            None => {
                // Validates the collection name
                CacheKey::list(collection, &Filters::new(), None)?;
                for tier in &self.tiers {
                    match tier.delete_collection(collection).await {
                        Ok(removed) => log::debug!(
                            "Invalidated {removed} entries of '{collection}' in {} tier",
                            tier.kind()
                        ),
                        Err(e) => log::warn!(
                            "Failed to invalidate '{collection}' in {} tier: {e}",
                            tier.kind()
                        ),
                    }
                }
            }
        }
        Ok(())
    }

    /// List every foundational collection so first reads hit the cache
    ///
    /// Failures are logged and skipped. Returns how many collections were
    /// warmed.
    pub async fn warm_cache(&self) -> usize {
        let mut warmed = 0;
        for collection in &self.config.foundational_collections {
            match self
                .get_list(collection, &Filters::new(), QueryOptions::new())
                .await
            {
                Ok(documents) => {
                    log::info!(
                        "Warmed '{collection}' with {} documents",
                        documents.len()
                    );
                    warmed += 1;
                }
                Err(e) => log::warn!("Failed to warm '{collection}': {e}"),
            }
        }
        warmed
    }

    /// Current hit/miss statistics
    pub fn get_stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }

    /// Empty every tier
    pub async fn clear_all(&self) {
        for tier in &self.tiers {
            if let Err(e) = tier.clear().await {
                log::warn!("Failed to clear {} tier: {e}", tier.kind());
            }
        }
        log::info!("Cleared all cache tiers");
    }

    /// End the browsing session: the session tier is emptied and released
    pub async fn end_session(&self) -> Result<()> {
        if let Some(session) = self.tier(TierKind::Session) {
            session.discard().await?;
        }
        Ok(())
    }

    fn checked_ttl(requested: Option<u64>, default: impl FnOnce() -> u64) -> Result<u64> {
        match requested {
            Some(0) => Err(ValidationError::invalid_parameter("ttl", "must be positive").into()),
            Some(ttl) => Ok(ttl),
            None => Ok(default()),
        }
    }

    /// Look up the tiers, falling back to `fetch` and writing the result through
    async fn read_through<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: u64,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        let _guard = self.locks.acquire(key).await;

        if !force_refresh && let Some((index, entry)) = self.lookup(key).await {
            let tier = self.tiers[index].kind();
            self.metrics.record_hit(tier);
            log::debug!("Cache hit for {key} in {tier} tier");
            self.promote(key, &entry, index).await;
            return Ok(Some(entry.into_data()));
        }

        self.metrics.record_miss();
        log::debug!("Cache miss for {key}, fetching from store");

        match fetch().await? {
            Some(data) => {
                let entry = CacheEntry::new(data, self.clock.now_millis(), ttl);
                self.write_through(key, &entry).await;
                Ok(Some(entry.into_data()))
            }
            None => {
                log::debug!("{key} does not exist in store");
                Ok(None)
            }
        }
    }

    /// First fresh entry in lookup order, with the index of its tier
    async fn lookup(&self, key: &CacheKey) -> Option<(usize, CacheEntry)> {
        let now = self.clock.now_millis();

        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(Some(entry)) if entry.is_fresh(now) => return Some((index, entry)),
                Ok(Some(_)) => {
                    log::debug!("Dropping stale {key} from {} tier", tier.kind());
                    if let Err(e) = tier.delete(key).await {
                        log::debug!("Failed to drop stale {key} from {} tier: {e}", tier.kind());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("{} tier read failed for {key}, treating as miss: {e}", tier.kind());
                }
            }
        }
        None
    }

    /// Copy a hit into the faster tiers that missed it
    async fn promote(&self, key: &CacheKey, entry: &CacheEntry, found_at: usize) {
        for tier in &self.tiers[..found_at] {
            self.store_in(tier, key, entry).await;
        }
    }

    async fn write_through(&self, key: &CacheKey, entry: &CacheEntry) {
        for tier in &self.tiers {
            self.store_in(tier, key, entry).await;
        }
        self.metrics.record_set();
    }

    /// Best-effort write into one tier
    ///
    /// A quota failure evicts the oldest entries and retries once; anything
    /// still failing is logged and dropped.
    async fn store_in(&self, tier: &Arc<dyn TierStore>, key: &CacheKey, entry: &CacheEntry) {
        let err = match tier.set(key, entry).await {
            Ok(()) => return,
            Err(e) => e,
        };

        if !err.is_quota_exceeded() {
            log::warn!("Dropping {} tier write for {key}: {err}", tier.kind());
            return;
        }

        match tier
            .clear_oldest_entries(self.config.eviction_fraction)
            .await
        {
            Ok(evicted) => {
                self.metrics.record_evictions(evicted);
                log::debug!("Evicted {evicted} entries from {} tier", tier.kind());
            }
            Err(e) => {
                log::warn!("Eviction in {} tier failed: {e}", tier.kind());
                return;
            }
        }

        if let Err(e) = tier.set(key, entry).await {
            log::warn!(
                "Dropping {} tier write for {key} after eviction: {e}",
                tier.kind()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::DocumentSnapshot;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn fetch_document(&self, _collection: &str, id: &str) -> Result<DocumentSnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if id == "missing" {
                Ok(DocumentSnapshot::missing())
            } else {
                Ok(DocumentSnapshot::found(json!({ "id": id })))
            }
        }

        async fn fetch_list(
            &self,
            _collection: &str,
            _filters: &Filters,
            limit: Option<usize>,
        ) -> Result<Vec<Value>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let all = vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})];
            Ok(all.into_iter().take(limit.unwrap_or(usize::MAX)).collect())
        }
    }

    fn manager() -> (Arc<CountingStore>, ManualClock, CacheManager) {
        let store = Arc::new(CountingStore::default());
        let clock = ManualClock::new(1_000_000);
        let manager =
            CacheManager::in_memory(store.clone()).with_clock(Arc::new(clock.clone()));
        (store, clock, manager)
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let (_, _, manager) = manager();
        let err = manager
            .get("deities", "zeus", GetOptions::new().with_ttl(0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ttl"));
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_tiers() {
        let (store, _, manager) = manager();
        manager.get("deities", "zeus", GetOptions::new()).await.unwrap();
        manager
            .get("deities", "zeus", GetOptions::new().with_force_refresh(true))
            .await
            .unwrap();

        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(manager.get_stats().misses, 2);
    }

    #[tokio::test]
    async fn test_stale_entry_removed_from_tier() {
        let (_, clock, manager) = manager();
        manager
            .get("deities", "zeus", GetOptions::new().with_ttl(100))
            .await
            .unwrap();
        clock.advance(100);

        let key = CacheKey::document("deities", "zeus").unwrap();
        let memory = manager.tier(TierKind::Memory).unwrap().clone();
        assert!(memory.get(&key).await.unwrap().is_some());

        // Lookup drops the stale copy, then the refetch stores a new one
        manager.get("deities", "zeus", GetOptions::new()).await.unwrap();
        let entry = memory.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.stored_at(), 1_000_100);
    }

    #[tokio::test]
    async fn test_list_limit_is_part_of_key() {
        let (store, _, manager) = manager();
        let filters = Filters::new();

        let two = manager
            .get_list("deities", &filters, QueryOptions::new().with_limit(2))
            .await
            .unwrap();
        let all = manager
            .get_list("deities", &filters, QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(two.len(), 2);
        assert_eq!(all.len(), 3);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_counts_even_when_tier_drops_write() {
        let store = Arc::new(CountingStore::default());
        let tiers = TierSet::new(
            Arc::new(crate::cache::MemoryTier::new()),
            Arc::new(crate::cache::MemoryTier::with_kind(TierKind::Session)),
            Arc::new(crate::cache::MemoryTier::with_kind(TierKind::Durable).with_quota(8)),
        );
        let manager = CacheManager::new(store, tiers, CacheConfig::default()).unwrap();

        manager
            .set("texts", "iliad", json!({"body": "Sing, O goddess"}), SetOptions::default())
            .await
            .unwrap();

        assert_eq!(manager.get_stats().sets, 1);
        let key = CacheKey::document("texts", "iliad").unwrap();
        let durable = manager.tier(TierKind::Durable).unwrap();
        assert!(durable.get(&key).await.unwrap().is_none());
        let memory = manager.tier(TierKind::Memory).unwrap();
        assert!(memory.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_as_deserializes() {
        #[derive(serde::Deserialize)]
        struct Doc {
            id: String,
        }

        let (_, _, manager) = manager();
        let doc: Doc = manager
            .get_as("deities", "odin", GetOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.id, "odin");
    }
}
