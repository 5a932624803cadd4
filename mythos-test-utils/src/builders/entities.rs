//! Entity documents for test scenarios

use crate::mocks::MockDocumentStore;
use serde_json::{Map, Value, json};

/// Builder for entity documents
///
/// ```rust,no_run
/// use mythos_test_utils::EntityBuilder;
///
/// let zeus = EntityBuilder::new("zeus")
///     .name("Zeus")
///     .mythology("greek")
///     .field("domain", "sky")
///     .build();
/// assert_eq!(zeus["name"], "Zeus");
/// ```
pub struct EntityBuilder {
    fields: Map<String, Value>,
}

impl EntityBuilder {
    pub fn new(id: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.to_string()));
        Self { fields }
    }

    pub fn name(self, name: &str) -> Self {
        self.field("name", name)
    }

    pub fn mythology(self, mythology: &str) -> Self {
        self.field("mythology", mythology)
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Seed a small Greek and Norse pantheon
///
/// - `mythologies`: `greek`, `norse`
/// - `deities`: `zeus`, `hera` (greek), `odin`, `thor` (norse)
/// - `creatures`: `medusa` (greek), `fenrir` (norse)
pub fn seed_pantheon(store: &MockDocumentStore) {
    store.seed_all(
        "mythologies",
        [
            json!({"id": "greek", "name": "Greek"}),
            json!({"id": "norse", "name": "Norse"}),
        ],
    );

    let deities = [
        ("zeus", "Zeus", "greek", "sky"),
        ("hera", "Hera", "greek", "marriage"),
        ("odin", "Odin", "norse", "wisdom"),
        ("thor", "Thor", "norse", "thunder"),
    ];
    store.seed_all(
        "deities",
        deities.map(|(id, name, mythology, domain)| {
            EntityBuilder::new(id)
                .name(name)
                .mythology(mythology)
                .field("domain", domain)
                .build()
        }),
    );

    store.seed_all(
        "creatures",
        [
            EntityBuilder::new("medusa").name("Medusa").mythology("greek").build(),
            EntityBuilder::new("fenrir").name("Fenrir").mythology("norse").build(),
        ],
    );
}
