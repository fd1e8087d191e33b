//! # cartline-service: Cart Operations
//!
//! Orchestrates the store, the pricing engine and the coupon rules behind a
//! small async API.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cartline Request Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /cart/items)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                cartline-service (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  CartService  │    │   UserLocks   │    │  CartConfig  │  │   │
//! │  │   │ (service.rs)  │───►│  (locks.rs)   │    │ (config.rs)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ get/add/update│    │ one mutex per │    │ TOML + env   │  │   │
//! │  │   │ remove/clear  │    │ user, weakly  │    │ tax/shipping │  │   │
//! │  │   │ coupons       │    │ held          │    │ limits, TTL  │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              │                                                          │
//! │       ┌──────┴───────┐                                                  │
//! │       ▼              ▼                                                  │
//! │  cartline-core   cartline-store                                        │
//! │  (pricing)       (Redis / memory)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `CartService` and its operations
//! - [`config`] - Configuration loading and validation
//! - [`locks`] - Per-user mutex registry
//! - [`error`] - Service error type
//!
//! ## Logging
//!
//! Everything logs through `tracing`. Binaries call [`init_tracing`], which
//! honors `RUST_LOG` and defaults to `info`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod locks;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::CartConfig;
pub use error::{ServiceError, ServiceResult};
pub use locks::UserLocks;
pub use service::{CartService, CartUpdate};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g. `"info"`).
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
