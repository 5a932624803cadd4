//! Test data builders

mod entities;

pub use entities::{EntityBuilder, seed_pantheon};
