//! Remote document store error types

use thiserror::Error;

/// Failures talking to the remote document store
///
/// "Document does not exist" is deliberately absent: the store answers that
/// with a snapshot whose `exists` flag is false.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or returned an error
    #[error("Document store request failed: {message}")]
    Transport { message: String },

    /// The store is offline
    #[error("Document store is unavailable")]
    Unavailable,

    /// The store returned a document that could not be interpreted
    #[error("Malformed document '{collection}/{id}': {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },
}

impl StoreError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a malformed document error
    pub fn malformed(collection: &str, id: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if retrying the request later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Unavailable)
    }
}
