//! Mythos Core Library
//!
//! Read path of a mythology encyclopedia: a three-tier document cache in
//! front of a remote document store, and a fragment router that turns
//! location changes into rendered content views.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod router;
pub mod store;

// Mock implementations and testing utilities live in the mythos-test-utils crate

// Re-export main types
pub use cache::{
    CacheEntry, CacheKey, CacheManager, CacheStats, GetOptions, QueryOptions, SetOptions,
    TierKind, TierPaths, TierSet, TierStore,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DurableBackend, RouterConfig};
pub use error::{Error, Result};
pub use router::{
    AuthHandle, AuthSignal, Location, MemoryLocation, Outlet, RouteOutcome, Renderer, Router,
    User, ViewMode, auth_channel,
};
pub use store::{DocumentSnapshot, DocumentStore, Filters};
