//! # Domain Types
//!
//! Core domain types used throughout Cartline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Cart       │   │    CartItem     │   │     Coupon      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  user_id (key)  │──►│  product_id     │   │  code           │       │
//! │  │  items          │   │  price          │   │  type           │       │
//! │  │  coupon         │   │  quantity       │   │  value          │       │
//! │  │  summary        │   │  subtotal       │   │  min purchase   │       │
//! │  │  version        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CartSummary    │   │    TaxRate      │   │   Percentage    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  item_count     │   │  bps (u32)      │   │  bps (u32)      │       │
//! │  │  subtotal, tax  │   │  825 = 8.25%    │   │  1000 = 10%     │       │
//! │  │  shipping       │   └─────────────────┘   └─────────────────┘       │
//! │  │  discount,total │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cached Document
//! `Cart` is serialized as-is (camelCase JSON) under `cart:{userId}`, so any
//! process sharing the cache reads back the exact same document.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Sales tax rate in basis points: 825 is 8.25%, 10_000 is 100%.
///
/// Serialized as the bare bps integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// No tax.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage-off amount in basis points (10000 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// 100% in basis points.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Whole percent, e.g. `from_percent(10)` = 10%.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Percentage(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A product line in the cart.
///
/// ## Design Notes
/// - `product_name`, `image`, `sku` are denormalized at add time and may go
///   stale if the catalog changes. The cart never looks them up again.
/// - `price` is the unit price from the most recent add of this product.
/// - `subtotal` is always `price × quantity`; recomputed on every reprice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartItem {
    /// Stable external product identifier.
    pub product_id: String,

    /// Display name at time of adding.
    pub product_name: String,

    /// Unit price.
    pub price: Money,

    /// Quantity in cart (always >= 1 while present).
    pub quantity: i64,

    /// Line total (price × quantity).
    pub subtotal: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub sku: Option<String>,

    /// When this product first entered the cart.
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,

    /// When this line last changed.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Calculates the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Caller input for `add_item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCartItem {
    pub product_id: String,
    pub product_name: String,
    pub price: Money,
    pub quantity: i64,
    #[serde(default)]
    #[ts(optional)]
    pub image: Option<String>,
    #[serde(default)]
    #[ts(optional)]
    pub sku: Option<String>,
}

impl NewCartItem {
    /// Convenience constructor without image or SKU.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        price: Money,
        quantity: i64,
    ) -> Self {
        NewCartItem {
            product_id: product_id.into(),
            product_name: product_name.into(),
            price,
            quantity,
            image: None,
            sku: None,
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// The two supported coupon shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CouponType {
    /// `value` is a percent of the subtotal, 0 to 100.
    Percentage,
    /// `value` is a currency amount.
    Fixed,
}

/// A coupon definition, as supplied by the caller's promotions source.
///
/// `value` is interpreted by `kind`; use [`Coupon::rule`] to get the typed form.
/// It is held in hundredths (basis points or cents) and travels as a decimal:
///
/// ```json
/// {"code": "SAVE10", "type": "percentage", "value": 10, "minimumPurchase": 100}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Coupon {
    pub code: String,

    #[serde(rename = "type")]
    pub kind: CouponType,

    /// Basis points for `percentage`, cents for `fixed`.
    #[serde(with = "crate::money::hundredths")]
    #[ts(type = "number")]
    pub value: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub minimum_purchase: Option<Money>,
}

/// Typed discount rule derived from a coupon's `type` + `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRule {
    Percentage(Percentage),
    Fixed(Money),
}

impl Coupon {
    /// Percentage-off coupon, `bps` in basis points.
    pub fn percentage(code: impl Into<String>, bps: u32) -> Self {
        Coupon {
            code: code.into(),
            kind: CouponType::Percentage,
            value: bps as i64,
            minimum_purchase: None,
        }
    }

    /// Fixed-amount coupon.
    pub fn fixed(code: impl Into<String>, amount: Money) -> Self {
        Coupon {
            code: code.into(),
            kind: CouponType::Fixed,
            value: amount.cents(),
            minimum_purchase: None,
        }
    }

    /// Sets the minimum purchase threshold.
    pub fn with_minimum_purchase(mut self, minimum: Money) -> Self {
        self.minimum_purchase = Some(minimum);
        self
    }

    /// Returns the typed rule. Only meaningful on a validated coupon;
    /// out-of-range values are clamped into range.
    pub fn rule(&self) -> DiscountRule {
        match self.kind {
            CouponType::Percentage => DiscountRule::Percentage(Percentage::from_bps(
                self.value.clamp(0, Percentage::MAX_BPS as i64) as u32,
            )),
            CouponType::Fixed => DiscountRule::Fixed(Money::from_cents(self.value.max(0))),
        }
    }
}

/// A coupon attached to a cart together with its resolved discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub discount: Money,
}

// =============================================================================
// Cart Summary
// =============================================================================

/// Derived monetary breakdown of a cart. Never mutated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartSummary {
    /// Sum of quantities.
    pub item_count: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    /// `max(0, subtotal + tax + shipping - discount)`.
    pub total: Money,
}

impl CartSummary {
    /// All-zero summary for an empty cart.
    pub const fn zero() -> Self {
        CartSummary {
            item_count: 0,
            subtotal: Money::zero(),
            tax: Money::zero(),
            shipping: Money::zero(),
            discount: Money::zero(),
            total: Money::zero(),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A shopper's cart, keyed by `user_id`.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding same product increases quantity)
/// - Quantity >= 1 while present (setting 0 removes the item)
/// - `summary` always matches `items` + `coupon` (see [`crate::pricing`])
/// - `version` increases by one on every committed write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    /// Owning user.
    pub user_id: String,

    /// Insertion-ordered product lines.
    pub items: Vec<CartItem>,

    /// Applied coupon, if any.
    #[serde(default)]
    pub coupon: Option<AppliedCoupon>,

    pub summary: CartSummary,

    /// ISO 4217 currency code.
    pub currency: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// When the cache entry lapses if nothing touches it.
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,

    /// Write counter for compare-and-set. 0 = never written.
    #[serde(default)]
    pub version: u64,
}

impl Cart {
    /// Creates a new empty cart for a user.
    pub fn new(
        user_id: impl Into<String>,
        currency: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Cart {
            user_id: user_id.into(),
            items: Vec::new(),
            coupon: None,
            summary: CartSummary::zero(),
            currency: currency.into(),
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
            version: 0,
        }
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of distinct products.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Finds a line by product ID.
    pub fn item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Code of the applied coupon, if any.
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon.as_ref().map(|c| c.coupon.code.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
