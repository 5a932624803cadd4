//! Handlebars-backed entity renderer
//!
//! Documents are reshaped into a small view model before rendering so the
//! templates only deal with strings.

use super::template_helpers::register_helpers;
use handlebars::Handlebars;
use mythos_core::error::InternalError;
use mythos_core::{Renderer, Result, ViewMode};
use serde::Serialize;
use serde_json::Value;

const DETAIL_TEMPLATE: &str = r#"<article class="entity-detail" data-id="{{id}}">
  <h1>{{title}}</h1>
{{#if description}}  <p>{{description}}</p>
{{/if}}  <dl>
{{#each fields}}    <dt>{{uppercase key}}</dt><dd>{{value}}</dd>
{{/each}}  </dl>
</article>"#;

const GRID_TEMPLATE: &str = r#"<section class="entity-grid">
{{#each items}}  <div class="card" data-id="{{id}}">
    <h2>{{title}}</h2>
{{#if description}}    <p>{{excerpt description 80}}</p>
{{/if}}  </div>
{{/each}}</section>"#;

const LIST_TEMPLATE: &str = r#"<ul class="entity-list">
{{#each items}}  <li data-id="{{id}}">{{title}}</li>
{{else}}  <li class="empty">No results</li>
{{/each}}</ul>"#;

/// Fields shown outside the field table
const PROMINENT_FIELDS: [&str; 3] = ["id", "name", "description"];

#[derive(Serialize)]
struct Field {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct EntityView {
    id: String,
    title: String,
    description: Option<String>,
    fields: Vec<Field>,
}

#[derive(Serialize)]
struct CollectionView {
    items: Vec<EntityView>,
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl EntityView {
    fn from_document(document: &Value) -> Self {
        let id = document.get("id").map(text).unwrap_or_default();
        let title = document
            .get("name")
            .map(text)
            .unwrap_or_else(|| id.clone());
        let description = document.get("description").map(text);

        let fields = document
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| !PROMINENT_FIELDS.contains(&key.as_str()))
                    .map(|(key, value)| Field {
                        key: key.clone(),
                        value: text(value),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id,
            title,
            description,
            fields,
        }
    }
}

/// Renders entities with the built-in detail, grid, and list templates
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        register_helpers(&mut handlebars);

        handlebars.register_template_string(&ViewMode::Detail.to_string(), DETAIL_TEMPLATE)?;
        handlebars.register_template_string(&ViewMode::Grid.to_string(), GRID_TEMPLATE)?;
        handlebars.register_template_string(&ViewMode::List.to_string(), LIST_TEMPLATE)?;

        Ok(Self { handlebars })
    }
}

impl Renderer for HandlebarsRenderer {
    fn render(&self, entities: &[Value], mode: ViewMode) -> Result<String> {
        let template = mode.to_string();
        let rendered = match mode {
            ViewMode::Detail => {
                let document = entities
                    .first()
                    .ok_or_else(|| InternalError::render("detail view needs one entity"))?;
                self.handlebars
                    .render(&template, &EntityView::from_document(document))
            }
            ViewMode::Grid | ViewMode::List => {
                let view = CollectionView {
                    items: entities.iter().map(EntityView::from_document).collect(),
                };
                self.handlebars.render(&template, &view)
            }
        };

        rendered.map_err(|e| InternalError::render(format!("{template} template: {e}")).into())
    }
}
