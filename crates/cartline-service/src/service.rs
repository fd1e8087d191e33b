//! # Cart Service
//!
//! The operations HTTP handlers call. Each mutation is one full
//! read-modify-write cycle against the store.
//!
//! ## Mutation Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CartService::mutate                                  │
//! │                                                                         │
//! │  lock(user_id)                      ← in-process serialization         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──► load ──► Slot (absent / malformed → fresh empty cart)            │
//! │  │     │                                                                │
//! │  │     ▼                                                                │
//! │  │   apply change ──── client error? ──► return, nothing written       │
//! │  │     │                                                                │
//! │  │     ▼                                                                │
//! │  │   reprice (re-resolve coupon) ──► verify invariants                 │
//! │  │     │                                                                │
//! │  │     ▼                                                                │
//! │  │   version += 1, slide TTL                                           │
//! │  │     │                                                                │
//! │  │     ▼                                                                │
//! │  └── compare_and_set ── lost? (another process wrote) ── retry         │
//! │        │                                                                │
//! │        ▼ won                                                            │
//! │  CartUpdate { cart, coupon_removed }                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use cartline_core::pricing::verify_cart;
use cartline_core::validation::validate_user_id;
use cartline_core::{
    Cart, CartLimits, Clock, CoreResult, Coupon, NewCartItem, PricingPolicy,
};
use cartline_store::{CartStore, Slot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CartConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::locks::UserLocks;

/// Result of every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    pub cart: Cart,

    /// The coupon came off because the subtotal dropped below its minimum.
    pub coupon_removed: bool,
}

/// Cart operations over a [`CartStore`].
///
/// ## Usage
/// ```rust,ignore
/// use std::sync::Arc;
/// use cartline_core::{Money, NewCartItem, SystemClock};
/// use cartline_service::{CartConfig, CartService};
/// use cartline_store::MemoryCartStore;
///
/// let service = CartService::new(
///     Arc::new(MemoryCartStore::default()),
///     Arc::new(SystemClock),
///     &CartConfig::default(),
/// )?;
///
/// let update = service
///     .add_item("u1", NewCartItem::new("p1", "Mug", Money::from_cents(1250), 2))
///     .await?;
/// assert_eq!(update.cart.summary.subtotal.cents(), 2500);
/// ```
pub struct CartService<S: CartStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
    policy: PricingPolicy,
    limits: CartLimits,
    currency: String,
    ttl: Duration,
    cart_ttl: chrono::Duration,
    max_attempts: u32,
}

impl<S: CartStore + ?Sized> CartService<S> {
    /// Builds a service from a validated config.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: &CartConfig) -> ServiceResult<Self> {
        config.validate()?;
        let ttl = config.ttl();
        let cart_ttl =
            chrono::Duration::from_std(ttl).map_err(|e| ServiceError::Config(e.to_string()))?;

        Ok(CartService {
            store,
            clock,
            locks: UserLocks::new(),
            policy: config.pricing_policy(),
            limits: config.limits(),
            currency: config.pricing.currency.clone(),
            ttl,
            cart_ttl,
            max_attempts: config.cart.max_conflict_retries.saturating_add(1),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Returns the user's cart, creating and persisting an empty one if none
    /// exists (or the stored value is unreadable). An existing cart is
    /// returned as stored, without a write.
    pub async fn get_cart(&self, user_id: &str) -> ServiceResult<Cart> {
        let update = self.mutate(user_id, "get_cart", |_, _| Ok(false)).await?;
        Ok(update.cart)
    }

    /// Adds a product, merging with an existing line for the same product.
    pub async fn add_item(&self, user_id: &str, item: NewCartItem) -> ServiceResult<CartUpdate> {
        let limits = self.limits;
        self.mutate(user_id, "add_item", |cart, now| {
            cart.add_item(item.clone(), &limits, now).map(|_| true)
        })
        .await
    }

    /// Sets a line's quantity. Zero removes the line.
    pub async fn update_item_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<CartUpdate> {
        let limits = self.limits;
        self.mutate(user_id, "update_item_quantity", |cart, now| {
            cart.set_quantity(product_id, quantity, &limits, now).map(|_| true)
        })
        .await
    }

    /// Removes a product from the cart.
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> ServiceResult<CartUpdate> {
        self.mutate(user_id, "remove_item", |cart, _| {
            cart.remove_item(product_id).map(|_| true)
        })
        .await
    }

    /// Empties the cart. The record itself (and its `created_at`) survives.
    pub async fn clear_cart(&self, user_id: &str) -> ServiceResult<CartUpdate> {
        self.mutate(user_id, "clear_cart", |cart, _| {
            cart.clear();
            Ok(true)
        })
        .await
    }

    /// Applies a coupon. Fails without touching the cart if the subtotal is
    /// below the coupon's minimum purchase.
    pub async fn apply_coupon(
        &self,
        user_id: &str,
        code: &str,
        coupon: &Coupon,
    ) -> ServiceResult<CartUpdate> {
        let policy = self.policy;
        self.mutate(user_id, "apply_coupon", |cart, _| {
            cart.apply_coupon(code, coupon, &policy).map(|_| true)
        })
        .await
    }

    /// Detaches the coupon, if any.
    pub async fn remove_coupon(&self, user_id: &str) -> ServiceResult<CartUpdate> {
        self.mutate(user_id, "remove_coupon", |cart, _| Ok(cart.remove_coupon()))
            .await
    }

    /// Deletes the stored cart. Returns true if one existed.
    pub async fn invalidate_cache(&self, user_id: &str) -> ServiceResult<bool> {
        validate_user_id(user_id)?;
        let _guard = self.locks.lock(user_id).await;
        let removed = self.store.delete(user_id).await?;
        info!(user_id = %user_id, removed, "Cart invalidated");
        Ok(removed)
    }

    // =========================================================================
    // Read-Modify-Write
    // =========================================================================

    /// Runs one mutation cycle. `apply` returns whether it changed the cart;
    /// an unchanged existing cart is returned without a write.
    async fn mutate<F>(&self, user_id: &str, op: &'static str, mut apply: F) -> ServiceResult<CartUpdate>
    where
        F: FnMut(&mut Cart, DateTime<Utc>) -> CoreResult<bool> + Send,
    {
        validate_user_id(user_id)?;
        let _guard = self.locks.lock(user_id).await;

        for attempt in 1..=self.max_attempts {
            let slot = self.store.load(user_id).await?;
            let expected = slot.revision();
            let existed = matches!(slot, Slot::Present(_));
            let now = self.clock.now();

            let mut cart = match slot.into_cart() {
                Some(cart) => cart,
                None => Cart::new(user_id, self.currency.clone(), now, self.cart_ttl),
            };

            let changed = apply(&mut cart, now)?;
            if existed && !changed {
                debug!(user_id = %user_id, op, version = cart.version, "No change, skipping write");
                return Ok(CartUpdate {
                    cart,
                    coupon_removed: false,
                });
            }

            let coupon_removed = cart.reprice(&self.policy)?;
            verify_cart(&cart)?;
            cart.touch(now, self.cart_ttl);
            cart.version = expected.next_version();

            if self
                .store
                .compare_and_set(user_id, &expected, &cart, self.ttl)
                .await?
            {
                if !existed {
                    info!(user_id = %user_id, op, "Created cart");
                }
                if coupon_removed {
                    info!(user_id = %user_id, op, "Coupon detached: subtotal below minimum purchase");
                }
                debug!(
                    user_id = %user_id,
                    op,
                    version = cart.version,
                    items = cart.line_count(),
                    total = %cart.summary.total,
                    "Cart written"
                );
                return Ok(CartUpdate {
                    cart,
                    coupon_removed,
                });
            }

            warn!(user_id = %user_id, op, attempt, "Cart changed concurrently, reloading");
        }

        Err(ServiceError::Conflict {
            user_id: user_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cartline_core::{CartError, CartSummary, ManualClock, Money, ValidationError};
    use cartline_store::{MemoryCartStore, Revision, StoreError, StoreResult};
    use chrono::TimeZone;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    struct Harness {
        clock: Arc<ManualClock>,
        store: Arc<MemoryCartStore>,
        service: CartService<MemoryCartStore>,
    }

    fn config() -> CartConfig {
        let mut config = CartConfig::default();
        config.pricing.tax_rate_bps = 825;
        config.shipping.flat_fee_cents = 599;
        config.shipping.free_threshold_cents = Some(5000);
        config
    }

    fn harness_with(config: CartConfig) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryCartStore::new(clock.clone()));
        let service = CartService::new(store.clone(), clock.clone(), &config).unwrap();
        Harness {
            clock,
            store,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(config())
    }

    fn item(id: &str, cents: i64, qty: i64) -> NewCartItem {
        NewCartItem::new(id, format!("Product {}", id), Money::from_cents(cents), qty)
    }

    #[tokio::test]
    async fn test_get_cart_creates_empty_cart_once() {
        let h = harness();

        let first = h.service.get_cart("u1").await.unwrap();
        assert!(first.is_empty());
        assert_eq!(first.summary, CartSummary::zero());
        assert_eq!(first.version, 1);
        assert_eq!(h.store.writes(), 1);

        let second = h.service.get_cart("u1").await.unwrap();
        assert_eq!(h.store.writes(), 1);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_add_item_scenario() {
        // p1 @ $50 × 2
        let h = harness();
        let update = h.service.add_item("u1", item("p1", 5000, 2)).await.unwrap();

        assert_eq!(update.cart.summary.subtotal.cents(), 10_000);
        assert_eq!(update.cart.summary.item_count, 2);
        assert_eq!(update.cart.summary.shipping, Money::zero());
        assert!(!update.coupon_removed);

        let stored = h.store.get("u1").await.unwrap().unwrap();
        assert_eq!(stored, update.cart);
    }

    #[tokio::test]
    async fn test_coupon_scenario() {
        // p1 2 @ $50, 10% off with $100 minimum
        let h = harness();
        h.service.add_item("u1", item("p1", 5000, 2)).await.unwrap();

        let coupon = Coupon::percentage("SAVE10", 1000).with_minimum_purchase(Money::from_cents(10_000));
        let update = h.service.apply_coupon("u1", "save10", &coupon).await.unwrap();

        let s = update.cart.summary;
        assert_eq!(s.discount.cents(), 1000);
        assert_eq!(s.total, s.subtotal + s.tax + s.shipping - s.discount);
        assert_eq!(update.cart.coupon_code(), Some("SAVE10"));
    }

    #[tokio::test]
    async fn test_coupon_below_minimum_leaves_store_untouched() {
        let h = harness();
        h.service.add_item("u1", item("p1", 2000, 1)).await.unwrap();
        let before = h.store.raw("u1").unwrap();

        let coupon = Coupon::fixed("BIG", Money::from_cents(500)).with_minimum_purchase(Money::from_cents(5000));
        let err = h.service.apply_coupon("u1", "BIG", &coupon).await.unwrap_err();

        assert!(matches!(err, ServiceError::Cart(CartError::MinimumPurchaseNotMet { .. })));
        assert!(err.is_client_error());
        assert_eq!(h.store.raw("u1").unwrap(), before);
    }

    #[tokio::test]
    async fn test_coupon_dropped_when_subtotal_falls() {
        let h = harness();
        h.service.add_item("u1", item("p1", 5000, 2)).await.unwrap();
        let coupon = Coupon::percentage("SAVE10", 1000).with_minimum_purchase(Money::from_cents(10_000));
        h.service.apply_coupon("u1", "SAVE10", &coupon).await.unwrap();

        let update = h.service.update_item_quantity("u1", "p1", 1).await.unwrap();
        assert!(update.coupon_removed);
        assert!(update.cart.coupon.is_none());
        assert_eq!(update.cart.summary.discount, Money::zero());
    }

    #[tokio::test]
    async fn test_update_to_zero_removes() {
        let h = harness();
        h.service.add_item("u1", item("p1", 5000, 2)).await.unwrap();
        let update = h.service.update_item_quantity("u1", "p1", 0).await.unwrap();
        assert!(update.cart.is_empty());
        assert_eq!(update.cart.summary.item_count, 0);
    }

    #[tokio::test]
    async fn test_client_errors() {
        let h = harness();
        h.service.add_item("u1", item("p1", 100, 1)).await.unwrap();
        let writes = h.store.writes();

        let err = h.service.remove_item("u1", "nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::Cart(CartError::ItemNotFound(_))));

        let err = h.service.update_item_quantity("u1", "p1", -3).await.unwrap_err();
        assert!(matches!(err, ServiceError::Cart(CartError::InvalidQuantity { quantity: -3 })));

        let err = h.service.add_item("u1", item("p2", 100, 0)).await.unwrap_err();
        assert!(err.is_client_error());

        let err = h.service.get_cart("").await.unwrap_err();
        assert!(err.is_client_error());

        assert_eq!(h.store.writes(), writes);
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_summary() {
        let h = harness();
        let base = h.service.add_item("u1", item("p1", 1999, 1)).await.unwrap();
        h.service.add_item("u1", item("p2", 750, 4)).await.unwrap();
        let after = h.service.remove_item("u1", "p2").await.unwrap();
        assert_eq!(after.cart.summary, base.cart.summary);
    }

    #[tokio::test]
    async fn test_clear_cart_keeps_record() {
        let h = harness();
        let created = h.service.add_item("u1", item("p1", 100, 1)).await.unwrap().cart.created_at;
        h.clock.advance(chrono::Duration::hours(1));

        let update = h.service.clear_cart("u1").await.unwrap();
        assert!(update.cart.is_empty());
        assert_eq!(update.cart.created_at, created);
        assert!(h.store.get("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_coupon() {
        let h = harness();
        h.service.add_item("u1", item("p1", 2000, 1)).await.unwrap();
        h.service
            .apply_coupon("u1", "FIVE", &Coupon::fixed("FIVE", Money::from_cents(500)))
            .await
            .unwrap();

        let update = h.service.remove_coupon("u1").await.unwrap();
        assert!(update.cart.coupon.is_none());
        assert_eq!(update.cart.summary.discount, Money::zero());

        let writes = h.store.writes();
        h.service.remove_coupon("u1").await.unwrap();
        assert_eq!(h.store.writes(), writes);
    }

    #[tokio::test]
    async fn test_invalidate_cache() {
        let h = harness();
        h.service.add_item("u1", item("p1", 100, 1)).await.unwrap();
        assert!(h.service.invalidate_cache("u1").await.unwrap());
        assert!(!h.service.invalidate_cache("u1").await.unwrap());

        let fresh = h.service.get_cart("u1").await.unwrap();
        assert!(fresh.is_empty());
        assert_eq!(fresh.version, 1);
    }

    #[tokio::test]
    async fn test_malformed_value_is_rebuilt() {
        let h = harness();
        h.store.insert_raw("u1", "{\"items\": \"nope\"}", WEEK).unwrap();

        let cart = h.service.get_cart("u1").await.unwrap();
        assert!(cart.is_empty());
        assert!(h.store.get("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_cart_starts_over() {
        let h = harness();
        h.service.add_item("u1", item("p1", 100, 1)).await.unwrap();
        h.clock.advance(chrono::Duration::days(8));

        let cart = h.service.get_cart("u1").await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_writes_slide_ttl() {
        let h = harness();
        h.service.add_item("u1", item("p1", 100, 1)).await.unwrap();
        h.clock.advance(chrono::Duration::days(5));

        let update = h.service.add_item("u1", item("p1", 100, 1)).await.unwrap();
        assert_eq!(update.cart.expires_at, h.clock.now() + chrono::Duration::days(7));
        assert_eq!(h.store.ttl_remaining("u1"), Some(WEEK));
    }

    #[tokio::test]
    async fn test_store_outage_is_not_an_empty_cart() {
        let h = harness();
        h.store.set_unavailable(true);

        let err = h.service.get_cart("u1").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ServiceError::Store(StoreError::Unavailable(_))));
    }

    /// Store whose compare-and-set always loses.
    struct AlwaysConflicting(MemoryCartStore);

    #[async_trait]
    impl CartStore for AlwaysConflicting {
        async fn load(&self, user_id: &str) -> StoreResult<Slot> {
            self.0.load(user_id).await
        }
        async fn set(&self, user_id: &str, cart: &Cart, ttl: Duration) -> StoreResult<()> {
            self.0.set(user_id, cart, ttl).await
        }
        async fn compare_and_set(&self, _: &str, _: &Revision, _: &Cart, _: Duration) -> StoreResult<bool> {
            Ok(false)
        }
        async fn delete(&self, user_id: &str) -> StoreResult<bool> {
            self.0.delete(user_id).await
        }
    }

    #[tokio::test]
    async fn test_conflict_after_retries() {
        let mut config = config();
        config.cart.max_conflict_retries = 2;
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(AlwaysConflicting(MemoryCartStore::new(clock.clone())));
        let service = CartService::new(store, clock, &config).unwrap();

        let err = service.add_item("u1", item("p1", 100, 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { attempts: 3, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_huge_prices_are_rejected_not_overflowed() {
        let h = harness();
        let half = i64::MAX / 2;

        let err = h.service.add_item("u1", item("p1", half, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Cart(CartError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(err.is_client_error());

        let err = h.service.add_item("u1", item("p2", half, 1)).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(h.store.writes(), 0);

        let cart = h.service.get_cart("u1").await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_decimal_coupon_json_means_whole_percent() {
        let h = harness();
        h.service.add_item("u1", item("p1", 5000, 2)).await.unwrap();

        let coupon: Coupon = serde_json::from_str(
            r#"{"code":"SAVE10","type":"percentage","value":10,"minimumPurchase":100}"#,
        )
        .unwrap();
        let update = h.service.apply_coupon("u1", "SAVE10", &coupon).await.unwrap();

        assert_eq!(update.cart.summary.discount, Money::from_cents(1000));
        let json = serde_json::to_value(&update.cart).unwrap();
        assert_eq!(json["summary"]["subtotal"], 100);
        assert_eq!(json["summary"]["discount"], 10);
        assert_eq!(json["coupon"]["coupon"]["value"], 10);
    }

    #[tokio::test]
    async fn test_quantity_limit_after_merge() {
        let mut config = config();
        config.cart.max_item_quantity = 10;
        let h = harness_with(config);

        h.service.add_item("u1", item("p1", 100, 6)).await.unwrap();
        let err = h.service.add_item("u1", item("p1", 100, 5)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Cart(CartError::QuantityTooLarge { requested: 11, max: 10 })
        ));
    }
}
