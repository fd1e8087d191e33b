//! # CartStore Contract
//!
//! The typed interface the service uses to reach the cache.
//!
//! ## Read-Modify-Write Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Versioned Write Cycle                                │
//! │                                                                         │
//! │  load(user) ──► Slot::Present(cart v7)   revision = Version(7)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mutate + reprice in memory, cart.version = 8                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compare_and_set(user, Version(7), cart v8, ttl)                       │
//! │       ├── stored still v7 ──► written, TTL refreshed ──► true          │
//! │       └── someone wrote v8 ─► nothing written ─────────► false         │
//! │                                   (service reloads and re-applies)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use cartline_core::validation::validate_user_id;
use cartline_core::Cart;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Key prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "cart";

/// Builds the cache key for a user: `{prefix}:{user_id}`.
///
/// ## Example
/// ```rust
/// use cartline_store::cart_key;
///
/// assert_eq!(cart_key("cart", "u1").unwrap(), "cart:u1");
/// assert!(cart_key("cart", "").is_err());
/// ```
pub fn cart_key(prefix: &str, user_id: &str) -> StoreResult<String> {
    validate_user_id(user_id).map_err(|e| StoreError::InvalidKey(e.to_string()))?;
    Ok(format!("{}:{}", prefix, user_id))
}

// =============================================================================
// Slot / Revision
// =============================================================================

/// What a load found under a user's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Nothing stored (never created, expired, or invalidated).
    Absent,
    /// Something is stored but it does not decode as a cart.
    Malformed { raw: String },
    /// A well-formed cart.
    Present(Cart),
}

impl Slot {
    /// The revision a compare-and-set must match to overwrite this slot.
    pub fn revision(&self) -> Revision {
        match self {
            Slot::Absent => Revision::Absent,
            Slot::Malformed { raw } => Revision::Raw(raw.clone()),
            Slot::Present(cart) => Revision::Version(cart.version),
        }
    }

    pub fn into_cart(self) -> Option<Cart> {
        match self {
            Slot::Present(cart) => Some(cart),
            _ => None,
        }
    }
}

/// The state a compare-and-set expects to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// Key must not exist.
    Absent,
    /// Key must hold exactly these bytes (used to replace malformed values).
    Raw(String),
    /// Key must hold a cart with this version.
    Version(u64),
}

impl Revision {
    /// Version to stamp on the cart that replaces this revision.
    pub fn next_version(&self) -> u64 {
        match self {
            Revision::Version(v) => v.saturating_add(1),
            _ => 1,
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Serializes a cart for storage.
pub fn encode(cart: &Cart) -> StoreResult<String> {
    Ok(serde_json::to_string(cart)?)
}

/// Decodes a raw cached value. Malformed values are logged, not returned as errors.
pub fn decode(key: &str, raw: Option<String>) -> Slot {
    let Some(raw) = raw else {
        return Slot::Absent;
    };
    match serde_json::from_str::<Cart>(&raw) {
        Ok(cart) => Slot::Present(cart),
        Err(e) => {
            warn!(key = %key, error = %e, bytes = raw.len(), "Malformed cart in cache, treating as absent");
            Slot::Malformed { raw }
        }
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Typed access to cached carts.
///
/// Implementations must refresh the TTL on every successful write and must
/// map communication failures to [`StoreError::Unavailable`].
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Reads whatever is stored for `user_id`.
    async fn load(&self, user_id: &str) -> StoreResult<Slot>;

    /// Reads a cart; missing and malformed values both read as `None`.
    async fn get(&self, user_id: &str) -> StoreResult<Option<Cart>> {
        Ok(self.load(user_id).await?.into_cart())
    }

    /// Unconditionally writes a cart and refreshes its TTL.
    async fn set(&self, user_id: &str, cart: &Cart, ttl: Duration) -> StoreResult<()>;

    /// Writes only if the stored state still matches `expected`.
    ///
    /// Returns false, writing nothing, when another writer got there first.
    async fn compare_and_set(
        &self,
        user_id: &str,
        expected: &Revision,
        cart: &Cart,
        ttl: Duration,
    ) -> StoreResult<bool>;

    /// Removes the cart. Returns true if something was deleted.
    async fn delete(&self, user_id: &str) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn cart(version: u64) -> Cart {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut cart = Cart::new("u1", "USD", now, ChronoDuration::days(7));
        cart.version = version;
        cart
    }

    #[test]
    fn test_cart_key() {
        assert_eq!(cart_key("cart", "user-42").unwrap(), "cart:user-42");
        assert_eq!(cart_key("shop:cart", "u1").unwrap(), "shop:cart:u1");
        assert!(matches!(cart_key("cart", " "), Err(StoreError::InvalidKey(_))));
        assert!(matches!(cart_key("cart", "a b"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("cart:u1", None), Slot::Absent);

        let raw = encode(&cart(3)).unwrap();
        assert_eq!(decode("cart:u1", Some(raw)), Slot::Present(cart(3)));

        let slot = decode("cart:u1", Some("{not json".to_string()));
        assert_eq!(slot, Slot::Malformed { raw: "{not json".to_string() });
        assert!(slot.into_cart().is_none());
    }

    #[test]
    fn test_revision_from_slot() {
        assert_eq!(Slot::Absent.revision(), Revision::Absent);
        assert_eq!(Slot::Present(cart(7)).revision(), Revision::Version(7));
        assert_eq!(
            Slot::Malformed { raw: "x".into() }.revision(),
            Revision::Raw("x".into())
        );
    }

    #[test]
    fn test_next_version() {
        assert_eq!(Revision::Absent.next_version(), 1);
        assert_eq!(Revision::Raw("garbage".into()).next_version(), 1);
        assert_eq!(Revision::Version(7).next_version(), 8);
    }
}
