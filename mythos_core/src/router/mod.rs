//! Fragment router
//!
//! Resolves the location fragment to a content view, loads its data through
//! the [`CacheManager`] and mounts the rendered markup into the [`Outlet`].
//! Nothing is resolved before the auth check finishes, and every handled
//! route ends with something mounted: content, a 404 view, an error view, or
//! a login prompt.
//!
//! Each call to [`Router::handle_route`] takes a navigation token. When
//! `latest_navigation_wins` is on, a handler whose token is no longer the
//! newest once its data arrives mounts nothing and reports
//! [`RouteOutcome::Superseded`].

pub mod auth;
pub mod history;
pub mod location;
pub mod render;
pub mod routes;
pub mod views;

pub use auth::{AuthHandle, AuthSignal, AuthState, User, auth_channel};
pub use history::{RouteHistory, RouteHistoryEntry};
pub use location::{Location, MemoryLocation};
pub use render::{Outlet, Renderer, ViewMode};
pub use routes::{RouteMatch, RouteName, RouteTable};

use crate::cache::{CacheManager, GetOptions, QueryOptions};
use crate::clock::{Clock, SystemClock};
use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::store::Filters;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Collection backing the home index and mythology pages
const MYTHOLOGIES: &str = "mythologies";

/// How a call to [`Router::handle_route`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Auth not resolved yet; nothing mounted
    Deferred,
    /// Content mounted and recorded in history
    Rendered(RouteName),
    /// 404 view mounted
    NotFound,
    /// Error view mounted with this message
    Failed(String),
    /// A newer navigation started while loading; nothing mounted
    Superseded,
    /// Login prompt mounted
    LoginRequired,
}

pub struct Router {
    cache: Arc<CacheManager>,
    renderer: Arc<dyn Renderer>,
    outlet: Arc<dyn Outlet>,
    location: Arc<dyn Location>,
    auth: AuthSignal,
    routes: RouteTable,
    config: RouterConfig,
    clock: Arc<dyn Clock>,
    history: Mutex<RouteHistory>,
    current: Mutex<Option<RouteMatch>>,
    navigation: AtomicU64,
}

impl Router {
    pub fn new(
        cache: Arc<CacheManager>,
        renderer: Arc<dyn Renderer>,
        outlet: Arc<dyn Outlet>,
        location: Arc<dyn Location>,
        auth: AuthSignal,
        config: RouterConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cache,
            renderer,
            outlet,
            location,
            auth,
            routes: RouteTable::new()?,
            history: Mutex::new(RouteHistory::new(config.max_history)),
            config,
            clock: Arc::new(SystemClock),
            current: Mutex::new(None),
            navigation: AtomicU64::new(0),
        })
    }

    /// Replace the clock used for history timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Move to `path`
    ///
    /// Only updates the location; route handling follows from the change
    /// notification (see [`Router::run`]) or an explicit
    /// [`Router::handle_route`].
    pub fn navigate(&self, path: &str) {
        let fragment = routes::normalize(path);
        log::debug!("Navigating to {fragment}");
        self.location.set_fragment(&fragment);
    }

    /// Resolve and mount the view for the current fragment
    pub async fn handle_route(&self) -> RouteOutcome {
        if !self.auth.is_resolved() {
            log::debug!("Auth not resolved, deferring route handling");
            return RouteOutcome::Deferred;
        }

        let token = self.navigation.fetch_add(1, Ordering::SeqCst) + 1;
        let fragment = self.location.fragment();

        let Some(matched) = self.routes.resolve(&fragment) else {
            log::debug!("No route matches {fragment:?}");
            self.outlet.mount(self.render_404());
            return RouteOutcome::NotFound;
        };

        if self.config.require_login
            && matched.name != RouteName::Home
            && self.auth.current_user().is_none()
        {
            log::debug!("Route {} requires login", matched.name);
            self.outlet.mount(views::login_required());
            return RouteOutcome::LoginRequired;
        }

        self.outlet.mount(views::loading());
        let loaded = self.load(&matched).await;

        if self.is_superseded(token) {
            log::debug!("Dropping render of {fragment:?}, superseded by a newer navigation");
            return RouteOutcome::Superseded;
        }

        match loaded {
            Ok(Some(markup)) => {
                self.outlet.mount(markup);
                self.history
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(fragment, self.clock.now_millis());
                let name = matched.name;
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(matched);
                RouteOutcome::Rendered(name)
            }
            Ok(None) => {
                self.outlet.mount(self.render_404());
                RouteOutcome::NotFound
            }
            Err(e) => {
                log::warn!("Failed to render {fragment:?}: {e}");
                self.outlet.mount(self.render_error(&e));
                RouteOutcome::Failed(e.to_string())
            }
        }
    }

    /// Re-handle the current route after the auth state changed
    pub async fn on_auth_changed(&self) -> RouteOutcome {
        log::debug!(
            "Auth changed, user: {:?}",
            self.auth.current_user().map(|user| user.uid)
        );
        self.handle_route().await
    }

    /// Handle routes until the location stops producing changes
    ///
    /// Waits for auth resolution, handles the current fragment once, then
    /// handles every location change and auth change in arrival order.
    pub async fn run(&self) {
        let mut locations = self.location.subscribe();
        let mut auth = self.auth.subscribe();

        self.auth.ready().await;
        // Resolution itself is covered by the first handling; any change
        // after this point re-handles the route from the loop below
        auth.mark_unchanged();
        // Fragments changed while waiting are covered by the first handling
        loop {
            match locations.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => return,
            }
        }
        self.handle_route().await;

        let mut auth_open = true;

        loop {
            tokio::select! {
                change = locations.recv() => match change {
                    Ok(_) => {
                        self.handle_route().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Skipped {skipped} location changes");
                        self.handle_route().await;
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = auth.changed(), if auth_open => match changed {
                    Ok(()) => {
                        self.on_auth_changed().await;
                    }
                    Err(_) => auth_open = false,
                },
            }
        }
    }

    /// Index of all mythologies
    pub async fn render_home(&self) -> Result<String> {
        let mythologies = self
            .cache
            .get_list(MYTHOLOGIES, &Filters::new(), QueryOptions::new())
            .await?;
        self.renderer.render(&mythologies, ViewMode::Grid)
    }

    pub fn render_404(&self) -> String {
        views::not_found(&self.location.fragment())
    }

    pub fn render_error(&self, error: &Error) -> String {
        views::error(&error.to_string())
    }

    /// Successfully handled routes, oldest first
    pub fn get_history(&self) -> Vec<RouteHistoryEntry> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .to_vec()
    }

    /// Ask the location to go back; `false` when there is nowhere to go
    pub fn go_back(&self) -> bool {
        self.location.back()
    }

    /// Last successfully rendered route
    pub fn current_route(&self) -> Option<RouteMatch> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_superseded(&self, token: u64) -> bool {
        self.config.latest_navigation_wins && self.navigation.load(Ordering::SeqCst) != token
    }

    /// Fetch and render the data for `matched`; `None` means not found
    async fn load(&self, matched: &RouteMatch) -> Result<Option<String>> {
        match matched.name {
            RouteName::Home => self.render_home().await.map(Some),
            RouteName::Mythology => {
                let id = matched.param("id").unwrap_or_default();
                let Some(mythology) = self.cache.get(MYTHOLOGIES, id, GetOptions::new()).await?
                else {
                    return Ok(None);
                };
                self.renderer.render(&[mythology], ViewMode::Detail).map(Some)
            }
            RouteName::Category => {
                let id = matched.param("id").unwrap_or_default();
                let collection = matched.param("type").unwrap_or_default();
                let filters = Filters::new().with("mythology", id);
                let entities = self
                    .cache
                    .get_list(collection, &filters, QueryOptions::new())
                    .await?;
                self.renderer.render(&entities, ViewMode::Grid).map(Some)
            }
            RouteName::Entity => {
                let id = matched.param("id").unwrap_or_default();
                let collection = matched.param("type").unwrap_or_default();
                let entity_id = matched.param("entityId").unwrap_or_default();
                let Some(entity) = self
                    .cache
                    .get(collection, entity_id, GetOptions::new())
                    .await?
                else {
                    return Ok(None);
                };
                if !belongs_to(&entity, id) {
                    log::debug!("{collection}/{entity_id} is not part of mythology '{id}'");
                    return Ok(None);
                }
                self.renderer.render(&[entity], ViewMode::Detail).map(Some)
            }
            RouteName::Search => {
                let collection = matched
                    .query
                    .get("collection")
                    .filter(|c| !c.is_empty())
                    .map_or(self.config.search_collection.as_str(), String::as_str);
                let filters: Filters = matched
                    .query
                    .iter()
                    .filter(|(key, _)| key.as_str() != "q" && key.as_str() != "collection")
                    .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                    .collect();

                let mut results = self
                    .cache
                    .get_list(collection, &filters, QueryOptions::new())
                    .await?;
                if let Some(term) = matched.query.get("q").filter(|q| !q.trim().is_empty()) {
                    let term = term.trim().to_lowercase();
                    results.retain(|entity| name_contains(entity, &term));
                }
                self.renderer.render(&results, ViewMode::List).map(Some)
            }
        }
    }
}

/// An entity without a `mythology` field is not tied to one
fn belongs_to(entity: &Value, mythology: &str) -> bool {
    match entity.get("mythology").and_then(Value::as_str) {
        Some(owner) => owner == mythology,
        None => true,
    }
}

fn name_contains(entity: &Value, lowercase_term: &str) -> bool {
    entity
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| name.to_lowercase().contains(lowercase_term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_belongs_to() {
        assert!(belongs_to(&json!({"mythology": "greek"}), "greek"));
        assert!(!belongs_to(&json!({"mythology": "norse"}), "greek"));
        assert!(belongs_to(&json!({"name": "Chaos"}), "greek"));
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        assert!(name_contains(&json!({"name": "Thor"}), "tho"));
        assert!(!name_contains(&json!({"name": "Odin"}), "thor"));
        assert!(!name_contains(&json!({"title": "Thor"}), "thor"));
    }
}
