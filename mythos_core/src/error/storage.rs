//! Cache tier storage error types

use thiserror::Error;

/// Errors raised by a cache tier while reading or persisting entries
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing the entry would exceed the tier's quota
    #[error(
        "Storage quota exceeded in {tier} tier: {required} bytes required, limit is {limit} bytes"
    )]
    QuotaExceeded {
        tier: String,
        limit: u64,
        required: u64,
    },

    /// A stored entry could not be decoded
    #[error("Corrupt cache entry '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Underlying I/O failure
    #[error("Storage I/O failure in {tier} tier: {message}")]
    Io { tier: String, message: String },
}

impl StorageError {
    /// Create a quota exceeded error
    pub fn quota_exceeded(tier: &str, limit: u64, required: u64) -> Self {
        Self::QuotaExceeded {
            tier: tier.to_string(),
            limit,
            required,
        }
    }

    /// Create a corrupt entry error
    pub fn corrupt(key: &str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error for a tier
    pub fn io(tier: &str, message: impl Into<String>) -> Self {
        Self::Io {
            tier: tier.to_string(),
            message: message.into(),
        }
    }

    /// Check if this is a quota failure
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
