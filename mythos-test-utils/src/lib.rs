//! Test utilities for Mythos
//!
//! This crate provides a scripted document store, recording renderer and
//! outlet, misbehaving cache tiers, and entity builders for testing the
//! cache manager and router.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{EntityBuilder, seed_pantheon};
pub use mocks::{
    FailingTier, FailureMode, MockDocumentStore, RecordingOutlet, RecordingRenderer, RenderCall,
};
