use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use mythos_core::{CacheConfig, RouterConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the JSON document store lives
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StoreConfig {
    pub root: PathBuf,
}

/// Identity the CLI browses as
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AuthConfig {
    /// Signed-in user id; anonymous when empty
    #[serde(default)]
    pub user: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: paths::get_store_dir(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            color_enabled: true,
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed("MYTHOS_").split("__"));

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        config
            .cache
            .validate()
            .context("Invalid cache configuration")?;
        config
            .router
            .validate()
            .context("Invalid router configuration")?;
        Ok(config)
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            toml::Value::Array(items) => Ok(items
                .iter()
                .map(|item| match item {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",")),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        Self::validate_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }

        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), Self::parse_config_value(key, value)?);

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            toml::Value::Array(values) => items.push((prefix, toml::Value::Array(values.clone()).to_string())),
            _ => {}
        }
    }

    /// Validate a configuration value
    fn validate_config_value(key: &str, value: &str) -> Result<()> {
        match key {
            k if k.ends_with("_ttl_ms") || k.starts_with("cache.collection_ttls.") => {
                let ttl: u64 = value.parse().context("TTL must be a positive integer")?;
                if ttl == 0 {
                    anyhow::bail!("TTL must be greater than 0");
                }
            }
            "cache.session_quota_bytes" | "cache.durable_quota_bytes" => {
                let _: u64 = value
                    .parse()
                    .context("Quota must be a non-negative integer")?;
            }
            "cache.eviction_fraction" => {
                let fraction: f64 = value.parse().context("eviction_fraction must be a number")?;
                if !(fraction > 0.0 && fraction <= 1.0) {
                    anyhow::bail!("eviction_fraction must be in (0, 1]");
                }
            }
            "cache.durable_backend" => {
                if !matches!(value, "file" | "sqlite") {
                    anyhow::bail!("durable_backend must be 'file' or 'sqlite'");
                }
            }
            "router.max_history" => {
                let max: usize = value
                    .parse()
                    .context("max_history must be a positive integer")?;
                if max == 0 {
                    anyhow::bail!("max_history must be greater than 0");
                }
            }
            "router.require_login" | "router.latest_navigation_wins" | "output.color_enabled" => {
                let _: bool = value.parse().context("Value must be 'true' or 'false'")?;
            }
            "output.default_format" => {
                if !matches!(value, "text" | "json") {
                    anyhow::bail!("default_format must be 'text' or 'json'");
                }
            }
            _ => {} // No validation for unknown keys
        }
        Ok(())
    }

    /// Parse a value to the appropriate TOML type
    fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
        match key {
            k if k.ends_with("_ms")
                || k.ends_with("_bytes")
                || k.ends_with("max_history")
                || k.starts_with("cache.collection_ttls.") =>
            {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            "cache.foundational_collections" => Ok(toml::Value::Array(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| toml::Value::String(s.to_string()))
                    .collect(),
            )),
            // Force string types for these fields
            "auth.user" | "store.root" | "router.search_collection" => {
                Ok(toml::Value::String(value.to_string()))
            }
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else if let Ok(f) = value.parse::<f64>() {
                    Ok(toml::Value::Float(f))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}
