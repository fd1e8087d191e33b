//! # cartline-store: Cache Layer for Cartline
//!
//! Typed, TTL-aware storage of cart documents with version-checked writes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cartline Data Flow                               │
//! │                                                                         │
//! │  CartService::add_item                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  cartline-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   CartStore   │    │RedisCartStore │    │MemoryCartStore│ │   │
//! │  │   │  (store.rs)   │◄───│ (redis_store) │    │  (memory.rs) │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ load / get    │    │ GET / SET EX  │    │ HashMap +    │  │   │
//! │  │   │ set / delete  │    │ DEL / EVAL    │    │ Clock expiry │  │   │
//! │  │   │ compare_and_set    │ Lua CAS       │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Redis                                       │   │
//! │  │   cart:{userId} → camelCase JSON, sliding 7-day TTL             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `CartStore` trait, `Slot`, `Revision`, key layout
//! - [`redis_store`] - Redis implementation
//! - [`memory`] - In-process implementation for tests and local runs
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cartline_store::{CartStore, RedisCartStore};
//!
//! let store = RedisCartStore::connect("redis://127.0.0.1/").await?;
//! let cart = store.get("user-42").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use memory::MemoryCartStore;
pub use redis_store::RedisCartStore;
pub use store::{cart_key, CartStore, Revision, Slot, DEFAULT_KEY_PREFIX};
