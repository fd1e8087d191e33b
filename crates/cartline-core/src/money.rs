//! # Money
//!
//! Every amount in a cart is a whole number of cents. Amounts are rounded
//! exactly once, at the point a rate (tax, percentage coupon) is applied, and
//! everything downstream is plain integer addition.
//!
//! ```text
//! price × quantity ──► line subtotal ──► cart subtotal
//!                                             │
//!                        ┌────────────────────┼────────────────┐
//!                        ▼                    ▼                ▼
//!                  tax (rounded)     shipping (flat)   discount (rounded)
//!                        └──────────────┬─────┴────────────────┘
//!                                       ▼
//!                              total, clamped at $0.00
//! ```
//!
//! ```rust
//! use cartline_core::money::Money;
//!
//! let line = Money::from_cents(5000).times(2);      // $100.00
//! let total = line + Money::from_cents(599);        // $105.99
//! assert_eq!(total.cents(), 10_599);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Percentage, TaxRate};

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

/// An amount in cents.
///
/// Signed so that `subtotal + tax + shipping - discount` can be computed
/// before clamping. On the wire it is a decimal amount of currency units
/// (`10.99`, `100`), see [`hundredths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Negative amounts become $0.00.
    ///
    /// ```rust
    /// use cartline_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-250).clamp_non_negative(), Money::zero());
    /// ```
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Tax owed on this amount, half-up on the cent.
    ///
    /// ```rust
    /// use cartline_core::money::Money;
    /// use cartline_core::types::TaxRate;
    ///
    /// // $10.00 at 8.25% is $0.825, billed as $0.83
    /// let tax = Money::from_cents(1000).tax_at(TaxRate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn tax_at(&self, rate: TaxRate) -> Money {
        Money(apply_bps(self.0, rate.bps()))
    }

    /// `pct` of this amount, half-up on the cent.
    ///
    /// ```rust
    /// use cartline_core::money::Money;
    /// use cartline_core::types::Percentage;
    ///
    /// let off = Money::from_cents(10_000).percentage_of(Percentage::from_bps(1000));
    /// assert_eq!(off.cents(), 1000);
    /// ```
    pub fn percentage_of(&self, pct: Percentage) -> Money {
        Money(apply_bps(self.0, pct.bps()))
    }

    /// Line total for `qty` units at this unit price. Saturates instead of
    /// wrapping; see [`Money::checked_times`] where overflow must be caught.
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `None` on overflow.
    #[inline]
    pub const fn checked_times(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` on overflow.
    #[inline]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

/// `round_half_up(cents * bps / 10000)`, widened to i128.
fn apply_bps(cents: i64, bps: u32) -> i64 {
    let scaled = cents as i128 * bps as i128;
    let rounded = if scaled >= 0 {
        (scaled + BPS_SCALE / 2) / BPS_SCALE
    } else {
        (scaled - BPS_SCALE / 2) / BPS_SCALE
    };
    rounded as i64
}

// =============================================================================
// Wire Format
// =============================================================================

/// Serde adapter for integers counted in hundredths that travel as plain
/// decimals: cents of a currency unit (`1099` is `10.99`) or basis points of
/// a percent (`1000` is `10`).
///
/// Whole values are written as integers. Input with more than two decimal
/// places is rejected rather than rounded.
///
/// ```rust
/// use cartline_core::money::Money;
///
/// assert_eq!(serde_json::to_string(&Money::from_cents(1099)).unwrap(), "10.99");
/// assert_eq!(serde_json::from_str::<Money>("50").unwrap(), Money::from_cents(5000));
/// ```
pub mod hundredths {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    /// Float noise tolerated around a whole hundredth.
    const SNAP: f64 = 0.01;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        if value % 100 == 0 {
            serializer.serialize_i64(value / 100)
        } else {
            serializer.serialize_f64(*value as f64 / 100.0)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(HundredthsVisitor)
    }

    struct HundredthsVisitor;

    impl<'de> Visitor<'de> for HundredthsVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal number with at most two decimal places")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            v.checked_mul(100)
                .ok_or_else(|| E::custom(format!("{} is out of range", v)))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v)
                .ok()
                .and_then(|v| v.checked_mul(100))
                .ok_or_else(|| E::custom(format!("{} is out of range", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            let scaled = v * 100.0;
            let rounded = scaled.round();
            if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
                return Err(E::custom(format!("{} is out of range", v)));
            }
            if (scaled - rounded).abs() > SNAP {
                return Err(E::custom(format!("{} has more than two decimal places", v)));
            }
            Ok(rounded as i64)
        }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hundredths::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hundredths::deserialize(deserializer).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// `$12.34` style, for logs and error messages only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.times(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_cents() {
        assert_eq!(Money::from_cents(10_599).to_string(), "$105.99");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::from_cents(-1250).to_string(), "-$12.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_line_arithmetic() {
        let price = Money::from_cents(899);
        assert_eq!(price.times(3).cents(), 2697);
        assert_eq!((price * 3).cents(), 2697);

        let mut running = Money::from_cents(2999);
        running += price;
        running -= Money::from_cents(98);
        assert_eq!(running.cents(), 3800);
    }

    #[test]
    fn test_times_saturates() {
        assert_eq!(Money::from_cents(i64::MAX).times(2).cents(), i64::MAX);
    }

    #[test]
    fn test_sum_of_lines() {
        let lines = [Money::from_cents(5000), Money::from_cents(2697), Money::from_cents(3)];
        let subtotal: Money = lines.iter().sum();
        assert_eq!(subtotal.cents(), 7700);

        let none: Money = std::iter::empty::<Money>().sum();
        assert!(none.is_zero());
    }

    #[test]
    fn test_tax_rounds_half_up() {
        assert_eq!(Money::from_cents(10_000).tax_at(TaxRate::from_bps(1000)).cents(), 1000);
        // $19.99 at 8.25% is $1.649175
        assert_eq!(Money::from_cents(1999).tax_at(TaxRate::from_bps(825)).cents(), 165);
        // exactly half a cent: $0.20 at 2.5% is $0.005
        assert_eq!(Money::from_cents(20).tax_at(TaxRate::from_bps(250)).cents(), 1);
        // $0.06 at 8.25% is $0.00495
        assert_eq!(Money::from_cents(6).tax_at(TaxRate::from_bps(825)).cents(), 0);
    }

    #[test]
    fn test_percentage_of() {
        let subtotal = Money::from_cents(10_000);
        assert_eq!(subtotal.percentage_of(Percentage::from_bps(10_000)), subtotal);
        assert!(subtotal.percentage_of(Percentage::from_bps(0)).is_zero());

        // $0.99 at 15% is $0.1485
        assert_eq!(Money::from_cents(99).percentage_of(Percentage::from_bps(1500)).cents(), 15);
    }

    #[test]
    fn test_negative_amounts_round_away_from_zero() {
        assert_eq!(apply_bps(-20, 250), -1);
        assert!(Money::from_cents(-1).is_negative());
        assert!(Money::from_cents(-1).clamp_non_negative().is_zero());
        assert!(!Money::zero().is_positive());
    }

    #[test]
    fn test_wire_format_is_decimal_currency() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1099)).unwrap(), "10.99");
        assert_eq!(serde_json::to_string(&Money::from_cents(10_000)).unwrap(), "100");
        assert_eq!(serde_json::to_string(&Money::from_cents(7)).unwrap(), "0.07");
        assert_eq!(serde_json::to_string(&Money::from_cents(-550)).unwrap(), "-5.5");

        let parse = |s: &str| serde_json::from_str::<Money>(s).map(|m| m.cents());
        assert_eq!(parse("10.99").unwrap(), 1099);
        assert_eq!(parse("50").unwrap(), 5000);
        assert_eq!(parse("0.1").unwrap(), 10);
        assert_eq!(parse("-5.5").unwrap(), -550);
    }

    #[test]
    fn test_wire_format_rejects_sub_cent_and_huge_values() {
        assert!(serde_json::from_str::<Money>("10.999").is_err());
        assert!(serde_json::from_str::<Money>("1e300").is_err());
        assert!(serde_json::from_str::<Money>("92233720368547758").is_err());
        assert!(serde_json::from_str::<Money>("\"10.99\"").is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let big = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(big.checked_times(2), None);
        assert_eq!(
            Money::from_cents(899).checked_times(3),
            Some(Money::from_cents(2697))
        );
        assert_eq!(
            Money::from_cents(100).checked_add(Money::from_cents(5)),
            Some(Money::from_cents(105))
        );
    }
}
