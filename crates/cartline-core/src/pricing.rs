//! # Pricing Engine
//!
//! Derives a [`CartSummary`] from an item list. Pure and deterministic.
//!
//! ## Computation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Summary Computation                                  │
//! │                                                                         │
//! │  items ──► subtotal = Σ price × quantity                                │
//! │                │                                                        │
//! │                ├──► tax      = round(subtotal × tax rate)               │
//! │                ├──► shipping = policy(subtotal, empty?)                 │
//! │                └──► discount = resolved by coupon module (passed in)    │
//! │                                                                         │
//! │  total = max(0, subtotal + tax + shipping − discount)                   │
//! │                                                                         │
//! │  Each field is rounded once, on its own. The total is a plain sum of   │
//! │  already-rounded cents, so no rounding error compounds.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CartError, CoreResult};
use crate::money::Money;
use crate::types::{Cart, CartItem, CartSummary, TaxRate};

// =============================================================================
// Shipping Policy
// =============================================================================

/// How shipping is charged. Comes from configuration.
///
/// ## Rules (first match wins)
/// 1. Empty cart → 0
/// 2. `free` flag set → 0
/// 3. subtotal ≥ `free_threshold` → 0
/// 4. otherwise → `flat_fee`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub flat_fee: Money,
    #[serde(default)]
    pub free_threshold: Option<Money>,
    #[serde(default)]
    pub free: bool,
}

impl ShippingPolicy {
    /// Flat fee on every non-empty cart.
    pub const fn flat(fee: Money) -> Self {
        ShippingPolicy {
            flat_fee: fee,
            free_threshold: None,
            free: false,
        }
    }

    /// Shipping is never charged.
    pub const fn free() -> Self {
        ShippingPolicy {
            flat_fee: Money::zero(),
            free_threshold: None,
            free: true,
        }
    }

    /// Waives the fee at or above `threshold`.
    pub const fn with_free_threshold(mut self, threshold: Money) -> Self {
        self.free_threshold = Some(threshold);
        self
    }

    /// Shipping charge for a cart with the given subtotal.
    pub fn charge_for(&self, subtotal: Money, has_items: bool) -> Money {
        if !has_items || self.free {
            return Money::zero();
        }
        match self.free_threshold {
            Some(threshold) if subtotal >= threshold => Money::zero(),
            _ => self.flat_fee,
        }
    }
}

/// Tax and shipping settings applied to every cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate: TaxRate,
    pub shipping: ShippingPolicy,
}

impl PricingPolicy {
    pub const fn new(tax_rate: TaxRate, shipping: ShippingPolicy) -> Self {
        PricingPolicy { tax_rate, shipping }
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Sum of `price × quantity` over all items.
///
/// Fails with [`CartError::AmountTooLarge`] instead of overflowing.
pub fn subtotal_of(items: &[CartItem]) -> CoreResult<Money> {
    items.iter().try_fold(Money::zero(), |acc, item| {
        item.price
            .checked_times(item.quantity)
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| too_large(format!("subtotal overflows at product {}", item.product_id)))
    })
}

/// Computes the summary for an item list.
///
/// `discount` must already be resolved (0 when no coupon is applied).
///
/// ## Example
/// ```rust
/// use cartline_core::money::Money;
/// use cartline_core::pricing::{compute_summary, ShippingPolicy};
/// use cartline_core::types::TaxRate;
///
/// let summary = compute_summary(&[], TaxRate::from_bps(825), &ShippingPolicy::flat(Money::from_cents(599)), Money::zero()).unwrap();
/// assert_eq!(summary.shipping, Money::zero()); // nothing ships on an empty cart
/// assert_eq!(summary.total, Money::zero());
/// ```
pub fn compute_summary(
    items: &[CartItem],
    tax_rate: TaxRate,
    shipping: &ShippingPolicy,
    discount: Money,
) -> CoreResult<CartSummary> {
    let item_count = item_count_of(items)?;
    let subtotal = subtotal_of(items)?;
    let tax = subtotal.tax_at(tax_rate);
    let shipping = shipping.charge_for(subtotal, !items.is_empty());
    let total = gross(subtotal, tax, shipping)
        .and_then(|g| g.checked_sub(discount))
        .ok_or_else(|| too_large(format!("total overflows (subtotal {})", subtotal)))?
        .clamp_non_negative();

    Ok(CartSummary {
        item_count,
        subtotal,
        tax,
        shipping,
        discount,
        total,
    })
}

fn item_count_of(items: &[CartItem]) -> CoreResult<i64> {
    items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.quantity))
        .ok_or_else(|| too_large("item count overflows".to_string()))
}

/// `subtotal + tax + shipping`, `None` on overflow.
fn gross(subtotal: Money, tax: Money, shipping: Money) -> Option<Money> {
    subtotal.checked_add(tax)?.checked_add(shipping)
}

fn too_large(msg: String) -> CartError {
    CartError::AmountTooLarge(msg)
}

// =============================================================================
// Invariants
// =============================================================================

/// Checks that a cart's derived state is consistent before it is persisted.
///
/// Fails with [`CartError::InvariantViolation`]; callers must not write a
/// cart that fails this check.
pub fn verify_cart(cart: &Cart) -> CoreResult<()> {
    let mut seen = HashSet::with_capacity(cart.items.len());
    for item in &cart.items {
        if !seen.insert(item.product_id.as_str()) {
            return Err(violation(format!("duplicate product {}", item.product_id)));
        }
        if item.quantity < 1 {
            return Err(violation(format!(
                "product {} has quantity {}",
                item.product_id, item.quantity
            )));
        }
        if item.price.is_negative() {
            return Err(violation(format!("product {} has negative price", item.product_id)));
        }
        if item.price.checked_times(item.quantity) != Some(item.subtotal) {
            return Err(violation(format!(
                "product {} subtotal {} != {} x {}",
                item.product_id, item.subtotal, item.price, item.quantity
            )));
        }
    }

    let s = &cart.summary;
    if s.subtotal != subtotal_of(&cart.items)? {
        return Err(violation(format!("summary subtotal {} does not match items", s.subtotal)));
    }
    if s.item_count != item_count_of(&cart.items)? {
        return Err(violation(format!("item count {} does not match items", s.item_count)));
    }
    if s.tax.is_negative() || s.shipping.is_negative() {
        return Err(violation("negative tax or shipping".to_string()));
    }
    let gross = gross(s.subtotal, s.tax, s.shipping)
        .ok_or_else(|| too_large(format!("total overflows (subtotal {})", s.subtotal)))?;
    if s.discount.is_negative() || s.discount > gross {
        return Err(violation(format!("discount {} out of range", s.discount)));
    }
    if s.total.is_negative() || s.total != (gross - s.discount).clamp_non_negative() {
        return Err(violation(format!("total {} inconsistent", s.total)));
    }

    let attached = cart.coupon.as_ref().map_or(Money::zero(), |c| c.discount);
    if attached != s.discount {
        return Err(violation(format!(
            "coupon discount {} != summary discount {}",
            attached, s.discount
        )));
    }

    Ok(())
}

fn violation(msg: String) -> CartError {
    CartError::InvariantViolation(msg)
}

// =============================================================================
// Unit Tests
// =============================================================================
