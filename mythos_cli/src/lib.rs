//! Mythos command line interface library
//!
//! Exposes the pieces `main.rs` assembles so they can be tested directly.

pub mod app;
pub mod config;
pub mod output;
pub mod paths;
pub mod store;
pub mod terminal;

pub use app::App;
pub use config::{AppConfig, ConfigManager};
pub use store::FileDocumentStore;
