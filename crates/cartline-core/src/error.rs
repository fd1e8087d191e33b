//! # Error Types
//!
//! Domain-specific error types for cartline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cartline-core errors (this file)                                      │
//! │  ├── CartError        - Cart rule violations + invariant failures      │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  cartline-store errors (separate crate)                                │
//! │  └── StoreError       - Cache communication failures                   │
//! │                                                                         │
//! │  cartline-service errors                                               │
//! │  └── ServiceError     - What the HTTP layer sees                       │
//! │                                                                         │
//! │  Flow: ValidationError → CartError → ServiceError → HTTP response      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Client Errors vs. Programming Errors
//! Every variant except [`CartError::InvariantViolation`] is caused by
//! caller input. Those are reported back and never retried. An invariant
//! violation means the pricing code produced an impossible summary; the cart
//! is not written to the store.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Cart Error
// =============================================================================

/// Cart business rule errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity is zero or negative where a positive count is required.
    ///
    /// ## When This Occurs
    /// - `add_item` with quantity <= 0
    /// - `update_item_quantity` with quantity < 0 (0 means remove)
    #[error("Invalid quantity {quantity}: must be a positive integer")]
    InvalidQuantity { quantity: i64 },

    /// Quantity exceeds the per-line maximum, including after a merge.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Product is not in the cart.
    #[error("Item not found in cart: {0}")]
    ItemNotFound(String),

    /// Cart has reached its maximum number of distinct products.
    #[error("Cart cannot have more than {max} items")]
    CartFull { max: usize },

    /// Coupon requires a larger subtotal.
    ///
    /// ## User Workflow
    /// ```text
    /// Subtotal: $20.00
    ///      │
    ///      ▼
    /// apply_coupon(SAVE10, minimum $50.00)
    ///      │
    ///      ▼
    /// MinimumPurchaseNotMet { required: $50.00, subtotal: $20.00 }
    ///      │
    ///      ▼
    /// UI shows: "Spend $30.00 more to use SAVE10"
    /// ```
    #[error("Minimum purchase of {required} not met (subtotal {subtotal})")]
    MinimumPurchaseNotMet { required: Money, subtotal: Money },

    /// Coupon definition is malformed or does not match the requested code.
    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    /// A line or cart amount does not fit the money representation.
    ///
    /// ## When This Occurs
    /// Prices and quantities that pass their own limits but whose sum over
    /// the cart overflows.
    #[error("Cart amount too large: {0}")]
    AmountTooLarge(String),

    /// A derived value broke a numeric invariant. Never persisted.
    #[error("Cart invariant violated: {0}")]
    InvariantViolation(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CartError {
    /// Returns true if this error was caused by caller input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CartError::InvariantViolation(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CoreResult<T> = Result<T, CartError>;

// =============================================================================
// Unit Tests
// =============================================================================
