use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use mythos_cli::app::{App, DEFAULT_SESSION};
use mythos_cli::output::{BufferedOutlet, OutputFormat, create_formatter};
use mythos_cli::terminal;
use mythos_cli::{AppConfig, ConfigManager};
use mythos_core::{Filters, GetOptions, QueryOptions, RouteOutcome, SetOptions};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "mythos")]
#[command(author, version, about = "Mythos - tiered document cache and fragment router for a mythology encyclopedia", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Session whose cache tier to use
    #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_SESSION)]
    session: String,

    /// Print cache statistics to stderr after the command
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one document through the cache
    Get {
        /// Collection name (e.g., deities)
        collection: String,

        /// Document id
        id: String,

        /// Override the collection TTL for this read, in milliseconds
        #[arg(long, value_name = "MS")]
        ttl_ms: Option<u64>,

        /// Skip the cache and refetch from the store
        #[arg(long)]
        force_refresh: bool,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Read a filtered list of documents through the cache
    List {
        /// Collection name
        collection: String,

        /// Equality filter, can be specified multiple times
        #[arg(short = 'f', long = "filter", value_name = "FIELD=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, Value)>,

        /// Maximum number of documents
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the list TTL for this read, in milliseconds
        #[arg(long, value_name = "MS")]
        ttl_ms: Option<u64>,

        /// Skip the cache and refetch from the store
        #[arg(long)]
        force_refresh: bool,

        /// Output format
        #[arg(short = 'o', long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Write a document into every cache tier
    Set {
        /// Collection name
        collection: String,

        /// Document id
        id: String,

        /// Document body as JSON
        data: String,

        /// TTL in milliseconds
        #[arg(long, value_name = "MS")]
        ttl_ms: Option<u64>,
    },

    /// Drop a document, or a whole collection, from every cache tier
    Invalidate {
        /// Collection name
        collection: String,

        /// Document id; the whole collection when omitted
        id: Option<String>,
    },

    /// Preload the foundational collections
    Warm,

    /// Empty every cache tier
    Clear,

    /// Discard the session tier
    EndSession,

    /// Render fragments through the router and print the resulting markup
    Browse {
        /// Fragments such as `#/mythology/greek`; read from stdin when omitted
        paths: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., cache.default_ttl_ms)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.default_ttl_ms)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,

    /// Print the configuration file path
    Path,
}

/// Parse `field=value`; the value is JSON when it parses as JSON, a string otherwise
fn parse_filter(raw: &str) -> std::result::Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("mythos_core", log::LevelFilter::Debug)
            .filter_module("mythos_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        command => {
            let config = ConfigManager::new()
                .load()
                .context("Failed to load configuration")?;
            let app = App::open(config, &cli.session).await?;

            let result = cache_command(&app, command).await;

            if cli.stats {
                let stats = app.cache.get_stats();
                eprintln!("{}", serde_json::to_string(&stats)?);
            }
            result
        }
    }
}

fn output_format(config: &AppConfig, requested: Option<OutputFormat>) -> Result<OutputFormat> {
    match requested {
        Some(format) => Ok(format),
        None => OutputFormat::from_string(&config.output.default_format),
    }
}

async fn cache_command(app: &App, command: Commands) -> Result<()> {
    let use_color = terminal::use_color(app.config.output.color_enabled);

    match command {
        Commands::Get {
            collection,
            id,
            ttl_ms,
            force_refresh,
            format,
        } => {
            let mut options = GetOptions::new().with_force_refresh(force_refresh);
            if let Some(ttl) = ttl_ms {
                options = options.with_ttl(ttl);
            }

            let Some(document) = app.cache.get(&collection, &id, options).await? else {
                anyhow::bail!("Document '{collection}/{id}' not found");
            };

            let formatter = create_formatter(output_format(&app.config, format)?, use_color);
            println!("{}", formatter.format_document(&document)?);
        }
        Commands::List {
            collection,
            filters,
            limit,
            ttl_ms,
            force_refresh,
            format,
        } => {
            let filters: Filters = filters.into_iter().collect();
            let mut options = QueryOptions::new().with_force_refresh(force_refresh);
            if let Some(limit) = limit {
                options = options.with_limit(limit);
            }
            if let Some(ttl) = ttl_ms {
                options = options.with_ttl(ttl);
            }

            let documents = app.cache.get_list(&collection, &filters, options).await?;

            let formatter = create_formatter(output_format(&app.config, format)?, use_color);
            println!("{}", formatter.format_list(&documents)?);
        }
        Commands::Set {
            collection,
            id,
            data,
            ttl_ms,
        } => {
            let data: Value = serde_json::from_str(&data).context("Document body is not JSON")?;
            app.cache
                .set(&collection, &id, data, SetOptions { ttl: ttl_ms })
                .await?;
            eprintln!("{}", format!("Cached {collection}/{id}").green());
        }
        Commands::Invalidate { collection, id } => {
            app.cache.invalidate(&collection, id.as_deref()).await?;
            match id {
                Some(id) => eprintln!("{}", format!("Invalidated {collection}/{id}").green()),
                None => eprintln!("{}", format!("Invalidated collection {collection}").green()),
            }
        }
        Commands::Warm => {
            let total = app.cache.config().foundational_collections.len();
            let warmed = app.cache.warm_cache().await;
            eprintln!("Warmed {warmed} of {total} collection(s)");
        }
        Commands::Clear => {
            app.cache.clear_all().await;
            eprintln!("{}", "Cleared all cache tiers".green());
        }
        Commands::EndSession => {
            app.cache.end_session().await?;
            eprintln!("{}", "Session ended".green());
        }
        Commands::Browse { paths } => {
            browse_command(app, paths).await?;
        }
        Commands::Config { .. } | Commands::Completions { .. } => {
            anyhow::bail!("not a cache command")
        }
    }

    Ok(())
}

async fn browse_command(app: &App, paths: Vec<String>) -> Result<()> {
    let outlet = Arc::new(BufferedOutlet::new());
    let router = app.router(outlet.clone())?;

    let warmed = app.cache.warm_cache().await;
    log::debug!("Warmed {warmed} foundational collection(s) before browsing");

    let paths = if paths.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut read = Vec::new();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                read.push(line.to_string());
            }
        }
        read
    } else {
        paths
    };

    for path in paths {
        router.navigate(&path);
        let outcome = router.handle_route().await;
        match &outcome {
            RouteOutcome::Failed(message) => log::warn!("Route {path} failed: {message}"),
            other => log::debug!("Route {path}: {other:?}"),
        }
        if let Some(markup) = outlet.take() {
            println!("{markup}");
        }
    }

    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => match manager.get(&key) {
            Ok(value) => {
                println!("{value}");
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Set { key, value } => match manager.set(&key, &value) {
            Ok(()) => {
                eprintln!("{}", format!("Set {key} = {value}").green());
                eprintln!(
                    "Configuration saved to: {}",
                    manager.get_config_path().display()
                );
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::List => match manager.list() {
            Ok(items) => {
                eprintln!("{}", "Configuration:".bold().blue());
                eprintln!("Config file: {}", manager.get_config_path().display());
                eprintln!();

                // Group items by section
                let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
                for (key, value) in items {
                    let section = key.split('.').next().unwrap_or("general").to_string();
                    sections.entry(section).or_default().push((key, value));
                }

                for (section, items) in sections {
                    println!("[{}]", section.yellow());
                    for (key, value) in items {
                        let display_key = key.split_once('.').map_or(key.as_str(), |(_, rest)| rest);
                        println!("  {} = {}", display_key.cyan(), value);
                    }
                    println!();
                }
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
