//! # cartline-core: Pure Cart Business Logic
//!
//! This crate is the **heart** of Cartline. It contains the cart pricing and
//! coupon rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cartline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP handlers (not in this workspace)           │   │
//! │  │    GET /cart ──► POST /cart/items ──► POST /cart/coupon         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            cartline-service (CartService)                       │   │
//! │  │    per-user lock ──► load ──► mutate ──► reprice ──► CAS write  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ cartline-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │ coupon  │ │  cart   │  │   │
//! │  │   │  Cart   │ │  Money  │ │ Summary │ │ resolve │ │ merge   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CACHE • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cartline-store (Cache Layer)                    │   │
//! │  │              Redis / in-memory, JSON, sliding TTL               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Cart, CartItem, Coupon, CartSummary, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Summary computation (tax, shipping, discount, total)
//! - [`coupon`] - Coupon resolution against a subtotal
//! - [`cart`] - Item list mutations with merge semantics
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use cartline_core::money::Money;
//! use cartline_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(10_000); // $100.00
//! let tax = subtotal.tax_at(TaxRate::from_bps(825)); // 8.25%
//! assert_eq!(tax.cents(), 825);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod clock;
pub mod coupon;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::CartLimits;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CartError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{PricingPolicy, ShippingPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product line.
///
/// Catches accidental over-ordering (1000 typed instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default sliding time-to-live for an idle cart: 7 days.
pub const DEFAULT_CART_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "USD";
