//! Remote document store contract
//!
//! The cache manager sits in front of a document store reachable through
//! single-document reads and filtered list reads. Implementations live
//! outside this crate (the CLI ships a JSON-directory store, the test
//! utilities a scripted mock).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of a single-document read
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub exists: bool,
    pub data: Option<Value>,
}

impl DocumentSnapshot {
    /// Snapshot of an existing document
    pub fn found(data: Value) -> Self {
        Self {
            exists: true,
            data: Some(data),
        }
    }

    /// Snapshot of an absent document
    pub fn missing() -> Self {
        Self {
            exists: false,
            data: None,
        }
    }

    /// Document payload, if the document exists
    pub fn into_data(self) -> Option<Value> {
        if self.exists { self.data } else { None }
    }
}

/// Field equality predicates combined with AND
///
/// Backed by a sorted map so the serialized form is canonical and can be
/// used inside cache keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Value>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Add an equality predicate in place
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Check a document against every predicate
    pub fn matches(&self, document: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// Canonical JSON form, stable across processes
    pub fn canonical(&self) -> String {
        // BTreeMap<String, Value> always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Remote document store the cache manager reads through
///
/// Transport problems are reported as errors; a document that does not
/// exist is reported through [`DocumentSnapshot::exists`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document
    async fn fetch_document(&self, collection: &str, id: &str) -> Result<DocumentSnapshot>;

    /// Fetch the documents of a collection matching every filter
    async fn fetch_list(
        &self,
        collection: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_match_with_and_semantics() {
        let filters = Filters::new()
            .with("mythology", "greek")
            .with("domain", "sky");

        assert!(filters.matches(&json!({"mythology": "greek", "domain": "sky", "name": "Zeus"})));
        assert!(!filters.matches(&json!({"mythology": "greek", "domain": "sea"})));
        assert!(!filters.matches(&json!({"mythology": "greek"})));
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(Filters::new().matches(&json!({"name": "Odin"})));
    }

    #[test]
    fn test_canonical_form_ignores_insertion_order() {
        let a = Filters::new().with("b", 2).with("a", "x");
        let b: Filters = vec![("a", json!("x")), ("b", json!(2))].into_iter().collect();

        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), r#"{"a":"x","b":2}"#);
    }

    #[test]
    fn test_snapshot_into_data() {
        assert_eq!(
            DocumentSnapshot::found(json!({"name": "Zeus"})).into_data(),
            Some(json!({"name": "Zeus"}))
        );
        assert_eq!(DocumentSnapshot::missing().into_data(), None);
    }
}
