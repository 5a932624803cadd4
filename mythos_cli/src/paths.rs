//! Centralized path management for the mythos CLI
//!
//! Every on-disk location the CLI touches is derived here so the cache
//! tiers, the document store, and the configuration file agree on layout.

use mythos_core::TierPaths;
use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "mythos";

/// One file per browsing session lives here
const SESSIONS_SUBDIR: &str = "sessions";

/// The durable cache tier lives here
const DURABLE_SUBDIR: &str = "cache";

/// Default location of the JSON document store
const STORE_SUBDIR: &str = "store";

/// Returns the base data directory for the application
///
/// On Unix-like systems this follows the XDG Base Directory specification
/// (`~/.local/share/mythos`); on Windows it is `%APPDATA%/mythos`.
/// Falls back to `.mythos` in the current directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".mythos"))
}

/// Directory holding one session-tier file per session name
pub fn get_sessions_dir() -> PathBuf {
    get_data_dir().join(SESSIONS_SUBDIR)
}

/// Directory holding the durable tier
pub fn get_durable_dir() -> PathBuf {
    get_data_dir().join(DURABLE_SUBDIR)
}

/// Default root of the JSON document store
pub fn get_store_dir() -> PathBuf {
    get_data_dir().join(STORE_SUBDIR)
}

/// Returns the path to the configuration directory (`~/.config/mythos`)
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".mythos"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// Tier locations for the named session
pub fn tier_paths(session_id: &str) -> TierPaths {
    TierPaths {
        session_dir: get_sessions_dir(),
        session_id: session_id.to_string(),
        durable_dir: get_durable_dir(),
    }
}
