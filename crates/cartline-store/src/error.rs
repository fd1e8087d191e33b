//! # Store Error Types
//!
//! Error types for cache operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  redis::RedisError / tokio timeout / serde_json::Error                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Categorized: retryable or not              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError (cartline-service) ← What the HTTP layer maps            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A malformed cached value is NOT an error here. It surfaces as
//! [`crate::Slot::Malformed`] and reads as an absent cart.

use thiserror::Error;

/// Cache operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache could not be reached or did not answer in time.
    ///
    /// ## When This Occurs
    /// - Connection refused or dropped
    /// - Operation exceeded the configured timeout
    /// - Server returned an error reply
    ///
    /// The cart state is unknown, not absent. Callers may retry.
    #[error("Cart store unavailable: {0}")]
    Unavailable(String),

    /// A cart could not be encoded for writing.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The user ID cannot form a cache key.
    #[error("Invalid cart key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    /// Returns true if retrying the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub(crate) fn timed_out(op: &str) -> Self {
        StoreError::Unavailable(format!("{} timed out", op))
    }
}

/// Convert redis errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// every redis::RedisError (io, timeout, refused, reply error) → Unavailable
/// ```
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(StoreError::timed_out("GET").is_retryable());
        assert!(!StoreError::Serialization("bad".into()).is_retryable());
        assert!(!StoreError::InvalidKey("".into()).is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            StoreError::timed_out("SET").to_string(),
            "Cart store unavailable: SET timed out"
        );
    }
}
