//! Rendering contracts
//!
//! The router turns entities into markup through a [`Renderer`] and shows it
//! through an [`Outlet`]. It never inspects the markup.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Layout hint passed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Single entity, full page
    Detail,
    /// Cards
    Grid,
    /// Compact rows
    List,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewMode::Detail => "detail",
            ViewMode::Grid => "grid",
            ViewMode::List => "list",
        };
        f.write_str(name)
    }
}

/// Turns entity documents into markup
pub trait Renderer: Send + Sync {
    fn render(&self, entities: &[Value], mode: ViewMode) -> Result<String>;
}

/// The content container views are mounted into
pub trait Outlet: Send + Sync {
    /// Replace the container's content
    fn mount(&self, markup: String);
}
