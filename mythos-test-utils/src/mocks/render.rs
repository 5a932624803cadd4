//! Recording renderer and outlet

use mythos_core::error::InternalError;
use mythos_core::{Outlet, Renderer, Result, ViewMode};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One call to [`Renderer::render`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub entities: Vec<Value>,
    pub mode: ViewMode,
}

/// Renderer that records its calls and emits predictable markup
///
/// Markup is `<{mode}>{names}</{mode}>` with entity names (or ids) joined
/// by commas, e.g. `<detail>Zeus</detail>`.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render with this message
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Markup this renderer produces for `entities`
    pub fn markup_for(entities: &[Value], mode: ViewMode) -> String {
        let names: Vec<&str> = entities
            .iter()
            .filter_map(|entity| {
                entity
                    .get("name")
                    .or_else(|| entity.get("id"))
                    .and_then(Value::as_str)
            })
            .collect();
        format!("<{mode}>{}</{mode}>", names.join(","))
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, entities: &[Value], mode: ViewMode) -> Result<String> {
        self.calls.lock().unwrap().push(RenderCall {
            entities: entities.to_vec(),
            mode,
        });
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(InternalError::render(message).into());
        }
        Ok(Self::markup_for(entities, mode))
    }
}

/// Outlet that keeps everything mounted into it
#[derive(Clone, Default)]
pub struct RecordingOutlet {
    mounted: Arc<Mutex<Vec<String>>>,
}

impl RecordingOutlet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted(&self) -> Vec<String> {
        self.mounted.lock().unwrap().clone()
    }

    /// What the container shows now
    pub fn current(&self) -> Option<String> {
        self.mounted.lock().unwrap().last().cloned()
    }

    pub fn mount_count(&self) -> usize {
        self.mounted.lock().unwrap().len()
    }
}

impl Outlet for RecordingOutlet {
    fn mount(&self, markup: String) {
        self.mounted.lock().unwrap().push(markup);
    }
}
