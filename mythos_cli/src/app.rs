//! Wiring between configuration, the document store, and the core services

use crate::config::AppConfig;
use crate::output::{BufferedOutlet, HandlebarsRenderer};
use crate::paths;
use crate::store::FileDocumentStore;
use anyhow::{Context, Result};
use mythos_core::{AuthSignal, CacheManager, MemoryLocation, Router, TierSet, User};
use std::sync::Arc;

/// Session used when `--session` is not given
pub const DEFAULT_SESSION: &str = "default";

/// Long-lived services for one CLI invocation
pub struct App {
    pub config: AppConfig,
    pub cache: Arc<CacheManager>,
}

impl App {
    /// Open the persistent cache tiers for `session` in front of the
    /// configured document store
    pub async fn open(config: AppConfig, session: &str) -> Result<Self> {
        let store = Arc::new(FileDocumentStore::new(&config.store.root));
        let tiers = TierSet::open(&config.cache, &paths::tier_paths(session))
            .await
            .context("Failed to open cache tiers")?;
        let cache = CacheManager::new(store, tiers, config.cache.clone())
            .context("Failed to create cache manager")?;

        log::debug!(
            "Opened session '{session}' over store {}",
            config.store.root.display()
        );

        Ok(Self {
            config,
            cache: Arc::new(cache),
        })
    }

    /// Identity from configuration, resolved up front
    pub fn auth(&self) -> AuthSignal {
        let user = Some(self.config.auth.user.trim())
            .filter(|uid| !uid.is_empty())
            .map(User::new);
        AuthSignal::resolved(user)
    }

    /// Router rendering with the built-in templates into `outlet`
    pub fn router(&self, outlet: Arc<BufferedOutlet>) -> Result<Router> {
        let renderer = HandlebarsRenderer::new().context("Failed to load view templates")?;
        let router = Router::new(
            self.cache.clone(),
            Arc::new(renderer),
            outlet,
            Arc::new(MemoryLocation::new()),
            self.auth(),
            self.config.router.clone(),
        )?;
        Ok(router)
    }
}
