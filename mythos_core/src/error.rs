//! Error types for the Mythos core library
//!
//! Errors are grouped by where they originate, each category in its own
//! module with constructor helpers and classification methods.

use thiserror::Error;

pub mod internal;
pub mod storage;
pub mod store;
pub mod validation;

pub use self::storage::StorageError;
pub use self::store::StoreError;
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Mythos core library
///
/// Errors are categorized into four main types:
/// - Store errors: the remote document store failed or answered garbage
/// - Storage errors: a cache tier could not read or persist an entry
/// - Validation errors: bad identifiers, parameters, or configuration
/// - Internal errors: rendering failures and broken invariants
///
/// A document that does not exist is not an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    /// Remote document store errors
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cache tier storage errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    /// Check whether this error came from the remote store
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Check whether this error is a storage quota failure
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_quota())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(InternalError::assertion(format!("JSON error: {err}")))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(StorageError::io("durable", format!("Database error: {err}")))
    }
}
