mod formatters;
mod outlet;
mod renderer;
mod template_helpers;

pub use formatters::{JsonFormatter, TextFormatter};
pub use outlet::BufferedOutlet;
pub use renderer::HandlebarsRenderer;

use anyhow::Result;
use mythos_core::CacheStats;
use serde_json::Value;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown output format: {}", s),
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Format a single document
    fn format_document(&self, document: &Value) -> Result<String>;

    /// Format a list of documents
    fn format_list(&self, documents: &[Value]) -> Result<String> {
        let formatted: Result<Vec<String>> =
            documents.iter().map(|d| self.format_document(d)).collect();

        Ok(formatted?.join("\n"))
    }

    /// Format cache statistics
    fn format_stats(&self, stats: &CacheStats) -> Result<String>;
}

/// Create a formatter based on output format
pub fn create_formatter(format: OutputFormat, use_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
