//! Scripted document store

use async_trait::async_trait;
use mythos_core::error::StoreError;
use mythos_core::{DocumentSnapshot, DocumentStore, Filters, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory [`DocumentStore`] with fetch counting and failure injection
///
/// Cloning shares the seeded documents, behavior, and counters, so a test
/// can hand one clone to the cache manager and keep another to script it.
///
/// # Examples
///
/// ```rust,no_run
/// use mythos_test_utils::MockDocumentStore;
/// use serde_json::json;
///
/// let store = MockDocumentStore::new();
/// store.seed("deities", "zeus", json!({"name": "Zeus", "mythology": "greek"}));
/// assert_eq!(store.fetch_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    behavior: Arc<Mutex<MockBehavior>>,
    document_fetches: Arc<AtomicUsize>,
    list_fetches: Arc<AtomicUsize>,
}

#[derive(Default)]
struct MockBehavior {
    /// collection -> id -> document
    documents: BTreeMap<String, BTreeMap<String, Value>>,
    failure: Option<String>,
    delay: Duration,
    document_delays: HashMap<(String, String), Duration>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document
    pub fn seed(&self, collection: &str, id: &str, document: Value) {
        let mut behavior = self.behavior.lock().unwrap();
        behavior
            .documents
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Store documents keyed by their `id` field
    pub fn seed_all(&self, collection: &str, documents: impl IntoIterator<Item = Value>) {
        for document in documents {
            let id = document
                .get("id")
                .and_then(Value::as_str)
                .expect("seeded documents need a string `id`")
                .to_string();
            self.seed(collection, &id, document);
        }
    }

    pub fn remove(&self, collection: &str, id: &str) {
        let mut behavior = self.behavior.lock().unwrap();
        if let Some(documents) = behavior.documents.get_mut(collection) {
            documents.remove(id);
        }
    }

    /// Fail every fetch with a transport error until [`Self::recover`]
    pub fn fail_with(&self, message: &str) {
        self.behavior.lock().unwrap().failure = Some(message.to_string());
    }

    pub fn recover(&self) {
        self.behavior.lock().unwrap().failure = None;
    }

    /// Delay every fetch
    pub fn set_delay(&self, delay: Duration) {
        self.behavior.lock().unwrap().delay = delay;
    }

    /// Delay fetches of one document, overriding [`Self::set_delay`]
    pub fn set_document_delay(&self, collection: &str, id: &str, delay: Duration) {
        self.behavior
            .lock()
            .unwrap()
            .document_delays
            .insert((collection.to_string(), id.to_string()), delay);
    }

    /// Document and list fetches so far
    pub fn fetch_count(&self) -> usize {
        self.document_fetches() + self.list_fetches()
    }

    pub fn document_fetches(&self) -> usize {
        self.document_fetches.load(Ordering::SeqCst)
    }

    pub fn list_fetches(&self) -> usize {
        self.list_fetches.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.document_fetches.store(0, Ordering::SeqCst);
        self.list_fetches.store(0, Ordering::SeqCst);
    }

    /// Apply the scripted delay and failure
    async fn scripted(&self, document: Option<(&str, &str)>) -> Result<()> {
        let (delay, failure) = {
            let behavior = self.behavior.lock().unwrap();
            let delay = document
                .and_then(|(c, id)| {
                    behavior
                        .document_delays
                        .get(&(c.to_string(), id.to_string()))
                        .copied()
                })
                .unwrap_or(behavior.delay);
            (delay, behavior.failure.clone())
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(message) => Err(StoreError::transport(message).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn fetch_document(&self, collection: &str, id: &str) -> Result<DocumentSnapshot> {
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        self.scripted(Some((collection, id))).await?;

        let behavior = self.behavior.lock().unwrap();
        Ok(behavior
            .documents
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
            .map_or_else(DocumentSnapshot::missing, DocumentSnapshot::found))
    }

    async fn fetch_list(
        &self,
        collection: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.list_fetches.fetch_add(1, Ordering::SeqCst);
        self.scripted(None).await?;

        let behavior = self.behavior.lock().unwrap();
        Ok(behavior
            .documents
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| filters.matches(document))
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
