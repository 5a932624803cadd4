use super::OutputFormatter;
use anyhow::Result;
use colored::*;
use mythos_core::CacheStats;
use serde_json::Value;

/// Fields printed as the heading rather than in the field table
const HEADING_FIELDS: [&str; 2] = ["id", "name"];

/// Text formatter for human-readable output
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl OutputFormatter for TextFormatter {
    fn format_document(&self, document: &Value) -> Result<String> {
        let mut output = String::new();

        let id = document.get("id").map(scalar).unwrap_or_default();
        let title = document.get("name").map(scalar).unwrap_or_else(|| id.clone());
        output.push_str(&self.colorize(&title, |s| s.bold()));
        if !id.is_empty() && id != title {
            output.push_str(&format!(" ({})", self.colorize(&id, |s| s.dimmed())));
        }
        output.push('\n');

        if let Some(fields) = document.as_object() {
            for (key, value) in fields {
                if HEADING_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                let key_str = self.colorize(key, |s| s.cyan());
                output.push_str(&format!("  {key_str}: {}\n", scalar(value)));
            }
        }

        Ok(output)
    }

    fn format_list(&self, documents: &[Value]) -> Result<String> {
        if documents.is_empty() {
            return Ok(self.colorize("No documents found", |s| s.yellow()));
        }

        let formatted: Result<Vec<String>> =
            documents.iter().map(|d| self.format_document(d)).collect();
        Ok(formatted?.join("\n"))
    }

    fn format_stats(&self, stats: &CacheStats) -> Result<String> {
        let rows = [
            ("Hits", stats.hits.to_string()),
            ("Misses", stats.misses.to_string()),
            ("Sets", stats.sets.to_string()),
            ("Memory hits", stats.memory_hits.to_string()),
            ("Session hits", stats.session_hits.to_string()),
            ("Durable hits", stats.durable_hits.to_string()),
            ("Evictions", stats.evictions.to_string()),
            ("Hit rate", stats.hit_rate.clone()),
            (
                "Avg response",
                format!("{:.2}ms", stats.avg_response_time_ms),
            ),
        ];

        let mut output = self.colorize("Cache statistics", |s| s.bold());
        output.push('\n');
        for (label, value) in rows {
            output.push_str(&format!("  {}: {value}\n", self.colorize(label, |s| s.cyan())));
        }
        Ok(output)
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn encode<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(encoded)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_document(&self, document: &Value) -> Result<String> {
        self.encode(document)
    }

    fn format_list(&self, documents: &[Value]) -> Result<String> {
        self.encode(documents)
    }

    fn format_stats(&self, stats: &CacheStats) -> Result<String> {
        self.encode(stats)
    }
}
