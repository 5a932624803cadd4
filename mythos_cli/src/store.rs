//! JSON-directory document store
//!
//! Layout is `<root>/<collection>/<id>.json`, one document per file. The
//! document's `id` field defaults to the file stem when absent.

use async_trait::async_trait;
use mythos_core::error::{StoreError, ValidationError};
use mythos_core::{DocumentSnapshot, DocumentStore, Filters, Result};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "json";

/// Document store backed by a directory tree of JSON files
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        check_segment("collection", collection)?;
        Ok(self.root.join(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf> {
        check_segment("document id", id)?;
        Ok(self
            .collection_dir(collection)?
            .join(format!("{id}.{DOCUMENT_EXTENSION}")))
    }
}

/// Reject names that would escape the store root
fn check_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        return Err(ValidationError::invalid_identifier(kind, value).into());
    }
    Ok(())
}

fn parse_document(collection: &str, id: &str, bytes: &[u8]) -> Result<Value> {
    let mut document: Value = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::malformed(collection, id, e.to_string()))?;

    let Some(fields) = document.as_object_mut() else {
        return Err(StoreError::malformed(collection, id, "expected a JSON object").into());
    };
    fields
        .entry("id")
        .or_insert_with(|| Value::String(id.to_string()));

    Ok(document)
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn fetch_document(&self, collection: &str, id: &str) -> Result<DocumentSnapshot> {
        let path = self.document_path(collection, id)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(DocumentSnapshot::found(parse_document(
                collection, id, &bytes,
            )?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DocumentSnapshot::missing()),
            Err(e) => Err(StoreError::transport(format!("{}: {e}", path.display())).into()),
        }
    }

    async fn fetch_list(
        &self,
        collection: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let dir = self.collection_dir(collection)?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::transport(format!("{}: {e}", dir.display())).into());
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::transport(format!("{}: {e}", dir.display())))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            if limit.is_some_and(|limit| documents.len() >= limit) {
                break;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| StoreError::transport(format!("{}: {e}", path.display())))?;
            let document = parse_document(collection, id, &bytes)?;
            if filters.matches(&document) {
                documents.push(document);
            }
        }

        log::debug!(
            "Listed {} documents from {} (filters {})",
            documents.len(),
            dir.display(),
            filters.canonical()
        );
        Ok(documents)
    }
}
