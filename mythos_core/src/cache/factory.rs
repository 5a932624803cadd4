//! Tier factory
//!
//! Builds the three cache layers from configuration.

use crate::cache::file_tier::FileTier;
use crate::cache::memory_tier::MemoryTier;
use crate::cache::traits::TierStore;
use crate::cache::TierKind;
use crate::config::{CacheConfig, DurableBackend};
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// File name of the JSON durable tier
const DURABLE_FILE: &str = "durable.json";

/// File name of the SQLite durable tier
#[cfg(feature = "database")]
const DURABLE_DB: &str = "cache.db";

/// Where the persistent tiers live on disk
#[derive(Debug, Clone)]
pub struct TierPaths {
    /// Directory holding one file per session
    pub session_dir: PathBuf,
    /// Name of the current session
    pub session_id: String,
    /// Directory holding the durable tier
    pub durable_dir: PathBuf,
}

/// The three cache layers, fastest first
#[derive(Clone)]
pub struct TierSet {
    pub memory: Arc<dyn TierStore>,
    pub session: Arc<dyn TierStore>,
    pub durable: Arc<dyn TierStore>,
}

impl TierSet {
    pub fn new(
        memory: Arc<dyn TierStore>,
        session: Arc<dyn TierStore>,
        durable: Arc<dyn TierStore>,
    ) -> Self {
        Self {
            memory,
            session,
            durable,
        }
    }

    /// Three in-process maps; nothing touches the disk
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTier::new()),
            Arc::new(MemoryTier::with_kind(TierKind::Session)),
            Arc::new(MemoryTier::with_kind(TierKind::Durable)),
        )
    }

    /// Open the configured persistent tiers
    pub async fn open(config: &CacheConfig, paths: &TierPaths) -> Result<Self> {
        let session = FileTier::session(&paths.session_dir, &paths.session_id)?
            .with_quota(config.session_quota_bytes);

        let durable: Arc<dyn TierStore> = match config.durable_backend {
            DurableBackend::File => Arc::new(
                FileTier::durable(paths.durable_dir.join(DURABLE_FILE))?
                    .with_quota(config.durable_quota_bytes),
            ),
            #[cfg(feature = "database")]
            DurableBackend::Sqlite => Arc::new(
                crate::cache::sqlite_tier::SqliteTier::new(&paths.durable_dir.join(DURABLE_DB))
                    .await?
                    .with_quota(config.durable_quota_bytes),
            ),
            #[cfg(not(feature = "database"))]
            DurableBackend::Sqlite => {
                return Err(crate::error::ValidationError::invalid_configuration(
                    "the sqlite durable backend requires the `database` feature",
                )
                .into());
            }
        };

        log::debug!(
            "Opened cache tiers: session '{}' in {}, durable {:?} in {}",
            paths.session_id,
            paths.session_dir.display(),
            config.durable_backend,
            paths.durable_dir.display()
        );

        Ok(Self::new(Arc::new(MemoryTier::new()), Arc::new(session), durable))
    }

    /// Layers in lookup order
    pub fn ordered(&self) -> Vec<Arc<dyn TierStore>> {
        vec![
            self.memory.clone(),
            self.session.clone(),
            self.durable.clone(),
        ]
    }
}
