//! # Cart Rules
//!
//! Pure mutations on a [`Cart`]. Nothing here touches the store; the service
//! layer loads a cart, calls one of these, then persists the result.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Mutations                                       │
//! │                                                                         │
//! │  Service Call              Cart Method             Item List Change     │
//! │  ────────────              ───────────             ────────────────     │
//! │                                                                         │
//! │  add_item ───────────────► add_item() ──────────► merge or push        │
//! │                                                                         │
//! │  update_item_quantity ───► set_quantity() ──────► qty = n (0 removes)  │
//! │                                                                         │
//! │  remove_item ────────────► remove_item() ───────► items.remove(i)      │
//! │                                                                         │
//! │  clear_cart ─────────────► clear() ─────────────► items + coupon gone  │
//! │                                                                         │
//! │  apply_coupon ───────────► apply_coupon() ──────► coupon attached      │
//! │                                                                         │
//! │  NOTE: every mutation ends with reprice(), which re-resolves the       │
//! │        coupon and rebuilds the summary.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::coupon::{self, Reresolution};
use crate::error::{CartError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, PricingPolicy};
use crate::types::{AppliedCoupon, Cart, CartItem, CartSummary, Coupon, NewCartItem};
use crate::validation::validate_new_item;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Size limits on a single cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLimits {
    /// Distinct products per cart.
    pub max_items: usize,
    /// Quantity per product line.
    pub max_item_quantity: i64,
}

impl Default for CartLimits {
    fn default() -> Self {
        CartLimits {
            max_items: MAX_CART_ITEMS,
            max_item_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

impl CartLimits {
    fn check_quantity(&self, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        if quantity > self.max_item_quantity {
            return Err(CartError::QuantityTooLarge {
                requested: quantity,
                max: self.max_item_quantity,
            });
        }
        Ok(())
    }
}

impl Cart {
    /// Adds a product, merging into an existing line with the same product ID.
    ///
    /// ## Merge Behavior
    /// - quantity: existing + incoming (must stay within the limit)
    /// - price, name: overwritten with incoming (price at time of last add)
    /// - image, sku: overwritten when incoming carries them
    /// - `added_at` kept, `updated_at` refreshed
    ///
    /// Fails without modifying the cart.
    pub fn add_item(
        &mut self,
        item: NewCartItem,
        limits: &CartLimits,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        limits.check_quantity(item.quantity)?;
        validate_new_item(&item)?;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            let merged = existing
                .quantity
                .checked_add(item.quantity)
                .filter(|q| *q <= limits.max_item_quantity)
                .ok_or(CartError::QuantityTooLarge {
                    requested: existing.quantity.saturating_add(item.quantity),
                    max: limits.max_item_quantity,
                })?;
            existing.quantity = merged;
            existing.price = item.price;
            existing.product_name = item.product_name;
            if item.image.is_some() {
                existing.image = item.image;
            }
            if item.sku.is_some() {
                existing.sku = item.sku;
            }
            existing.subtotal = existing.line_total();
            existing.updated_at = now;
            return Ok(());
        }

        if self.items.len() >= limits.max_items {
            return Err(CartError::CartFull {
                max: limits.max_items,
            });
        }

        self.items.push(CartItem {
            subtotal: item.price.times(item.quantity),
            product_id: item.product_id,
            product_name: item.product_name,
            price: item.price,
            quantity: item.quantity,
            image: item.image,
            sku: item.sku,
            added_at: now,
            updated_at: now,
        });
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(
        &mut self,
        product_id: &str,
        quantity: i64,
        limits: &CartLimits,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id).map(|_| ());
        }
        limits.check_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.to_string()))?;
        item.quantity = quantity;
        item.subtotal = item.line_total();
        item.updated_at = now;
        Ok(())
    }

    /// Removes a line and returns it.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<CartItem> {
        let idx = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.to_string()))?;
        Ok(self.items.remove(idx))
    }

    /// Empties the cart and drops any coupon. `created_at` survives.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon = None;
        self.summary = CartSummary::zero();
    }

    /// Attaches a coupon after resolving it against the current subtotal.
    ///
    /// `code` is what the shopper typed; it must match `coupon.code`
    /// ignoring case. On any error the cart is unchanged.
    pub fn apply_coupon(
        &mut self,
        code: &str,
        coupon: &Coupon,
        policy: &PricingPolicy,
    ) -> CoreResult<()> {
        coupon::validate_coupon(coupon)?;
        if !coupon::code_matches(code, coupon) {
            return Err(CartError::InvalidCoupon(format!(
                "code {} does not match coupon {}",
                code.trim(),
                coupon.code
            )));
        }

        let coupon = coupon::normalized(coupon);
        let discount = coupon::resolve(&coupon, pricing::subtotal_of(&self.items)?)?;
        let previous = self.coupon.replace(AppliedCoupon { coupon, discount });
        if let Err(e) = self.reprice(policy) {
            self.coupon = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Detaches the coupon. Returns false if none was attached.
    pub fn remove_coupon(&mut self) -> bool {
        self.coupon.take().is_some()
    }

    /// Rebuilds line subtotals and the summary, re-resolving any coupon.
    ///
    /// Returns true if the coupon was detached because the subtotal fell
    /// below its minimum purchase. Fails with [`CartError::AmountTooLarge`]
    /// and leaves coupon and summary untouched if an amount overflows.
    pub fn reprice(&mut self, policy: &PricingPolicy) -> CoreResult<bool> {
        let subtotal = pricing::subtotal_of(&self.items)?;
        let (coupon, coupon_removed) = match &self.coupon {
            Some(applied) => match coupon::reresolve(applied, subtotal) {
                Reresolution::Kept(kept) => (Some(kept), false),
                Reresolution::Dropped => (None, true),
            },
            None => (None, false),
        };

        let discount = coupon.as_ref().map_or(Money::zero(), |c| c.discount);
        let summary =
            pricing::compute_summary(&self.items, policy.tax_rate, &policy.shipping, discount)?;

        for item in &mut self.items {
            item.subtotal = item.line_total();
        }
        self.coupon = coupon;
        self.summary = summary;
        Ok(coupon_removed)
    }

    /// Stamps a write: refreshes `updated_at` and slides `expires_at`.
    pub fn touch(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.updated_at = now;
        self.expires_at = now + ttl;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
