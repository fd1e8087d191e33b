//! # Service Error Types
//!
//! The single error type returned by every `CartService` operation.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ServiceError                                       │
//! │                                                                         │
//! │  CLIENT (4xx, never retried, cart untouched)                           │
//! │  └── Cart(ItemNotFound | InvalidQuantity | QuantityTooLarge |          │
//! │           CartFull | MinimumPurchaseNotMet | InvalidCoupon |           │
//! │           Validation)                                                  │
//! │                                                                         │
//! │  RETRYABLE (503, caller may retry the whole operation)                 │
//! │  ├── Store(Unavailable)                                                │
//! │  └── Conflict (CAS lost too many times in a row)                       │
//! │                                                                         │
//! │  INTERNAL (500)                                                        │
//! │  ├── Cart(InvariantViolation)                                          │
//! │  ├── Store(Serialization | InvalidKey)                                 │
//! │  └── Config                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use cartline_core::{CartError, ValidationError};
use cartline_store::StoreError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A cart rule rejected the operation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The cache failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another writer kept winning the compare-and-set.
    ///
    /// ## When This Occurs
    /// Several processes hammer the same cart and this one lost
    /// `attempts` times in a row.
    #[error("Cart for {user_id} kept changing underneath us ({attempts} attempts)")]
    Conflict { user_id: String, attempts: u32 },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Returns true if the caller sent bad input.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Cart(e) => e.is_client_error(),
            ServiceError::Store(StoreError::InvalidKey(_)) => true,
            _ => false,
        }
    }

    /// Returns true if retrying the operation might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Store(e) => e.is_retryable(),
            ServiceError::Conflict { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(self, ServiceError::Config(_))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Cart(CartError::Validation(err))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}
