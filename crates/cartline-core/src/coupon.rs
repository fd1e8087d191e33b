//! # Coupon Resolution
//!
//! Turns a coupon definition and a subtotal into a discount amount.
//!
//! ## Lifecycle
//! ```text
//! apply_coupon(code, coupon)
//!      │
//!      ├── validate definition ────────► InvalidCoupon
//!      ├── code matches? ──────────────► InvalidCoupon
//!      ├── subtotal < minimum? ────────► MinimumPurchaseNotMet (cart untouched)
//!      ▼
//! attach { coupon, discount }
//!      │
//!      ▼  (every later item mutation)
//! re-resolve against new subtotal
//!      ├── still valid ──► discount updated
//!      └── below minimum ─► coupon detached, couponRemoved = true
//! ```

use crate::error::{CartError, CoreResult};
use crate::money::Money;
use crate::types::{AppliedCoupon, Coupon, CouponType, DiscountRule, Percentage};

/// Longest accepted coupon code.
pub const MAX_CODE_LEN: usize = 64;

/// Checks a coupon definition before it is used.
pub fn validate_coupon(coupon: &Coupon) -> CoreResult<()> {
    let code = coupon.code.trim();
    if code.is_empty() {
        return Err(CartError::InvalidCoupon("code is empty".into()));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(CartError::InvalidCoupon(format!(
            "code longer than {} characters",
            MAX_CODE_LEN
        )));
    }
    match coupon.kind {
        CouponType::Percentage if !(0..=Percentage::MAX_BPS as i64).contains(&coupon.value) => {
            return Err(CartError::InvalidCoupon(format!(
                "percentage {} bps outside 0..={}",
                coupon.value,
                Percentage::MAX_BPS
            )));
        }
        CouponType::Fixed if coupon.value < 0 => {
            return Err(CartError::InvalidCoupon("fixed amount is negative".into()));
        }
        _ => {}
    }
    if coupon.minimum_purchase.is_some_and(|m| m.is_negative()) {
        return Err(CartError::InvalidCoupon("minimum purchase is negative".into()));
    }
    Ok(())
}

/// Case-insensitive comparison of a requested code against a definition.
pub fn code_matches(requested: &str, coupon: &Coupon) -> bool {
    requested.trim().eq_ignore_ascii_case(coupon.code.trim())
}

/// Returns a copy of the coupon with its code trimmed and upper-cased.
pub fn normalized(coupon: &Coupon) -> Coupon {
    Coupon {
        code: coupon.code.trim().to_ascii_uppercase(),
        ..coupon.clone()
    }
}

/// Resolves the discount a coupon grants on `subtotal`.
///
/// ## Rules
/// - percentage: `round(subtotal × bps / 10000)`
/// - fixed: `min(value, subtotal)`
/// - `subtotal < minimum_purchase` fails; equality passes
///
/// ## Example
/// ```rust
/// use cartline_core::coupon::resolve;
/// use cartline_core::money::Money;
/// use cartline_core::types::Coupon;
///
/// let save10 = Coupon::percentage("SAVE10", 1000).with_minimum_purchase(Money::from_cents(10_000));
/// assert_eq!(resolve(&save10, Money::from_cents(10_000)).unwrap().cents(), 1000);
/// assert!(resolve(&save10, Money::from_cents(9_999)).is_err());
/// ```
pub fn resolve(coupon: &Coupon, subtotal: Money) -> CoreResult<Money> {
    if let Some(required) = coupon.minimum_purchase {
        if subtotal < required {
            return Err(CartError::MinimumPurchaseNotMet { required, subtotal });
        }
    }

    let discount = match coupon.rule() {
        DiscountRule::Percentage(pct) => subtotal.percentage_of(pct),
        DiscountRule::Fixed(amount) => amount.min(subtotal),
    };
    Ok(discount.clamp_non_negative())
}

/// Outcome of re-resolving an attached coupon after the items changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reresolution {
    /// Coupon still applies with this discount.
    Kept(AppliedCoupon),
    /// Subtotal fell below the minimum; the coupon must come off.
    Dropped,
}

/// Re-resolves an attached coupon against a new subtotal.
pub fn reresolve(applied: &AppliedCoupon, subtotal: Money) -> Reresolution {
    match resolve(&applied.coupon, subtotal) {
        Ok(discount) => Reresolution::Kept(AppliedCoupon {
            coupon: applied.coupon.clone(),
            discount,
        }),
        Err(_) => Reresolution::Dropped,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_discount() {
        let coupon = Coupon::percentage("SAVE10", 1000);
        assert_eq!(resolve(&coupon, Money::from_cents(10_000)).unwrap().cents(), 1000);
        // 10% of $0.05 rounds half-up to $0.01
        assert_eq!(resolve(&coupon, Money::from_cents(5)).unwrap().cents(), 1);
        assert_eq!(resolve(&coupon, Money::from_cents(4)).unwrap().cents(), 0);
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let coupon = Coupon::fixed("FIVE", Money::from_cents(500));
        assert_eq!(resolve(&coupon, Money::from_cents(2000)).unwrap().cents(), 500);
        assert_eq!(resolve(&coupon, Money::from_cents(300)).unwrap().cents(), 300);
        assert_eq!(resolve(&coupon, Money::zero()).unwrap(), Money::zero());
    }

    #[test]
    fn test_minimum_purchase_boundary() {
        let coupon = Coupon::fixed("TEN", Money::from_cents(1000)).with_minimum_purchase(Money::from_cents(5000));
        assert!(resolve(&coupon, Money::from_cents(5000)).is_ok());

        let err = resolve(&coupon, Money::from_cents(4999)).unwrap_err();
        assert_eq!(
            err,
            CartError::MinimumPurchaseNotMet {
                required: Money::from_cents(5000),
                subtotal: Money::from_cents(4999),
            }
        );
    }

    #[test]
    fn test_full_percentage_equals_subtotal() {
        let coupon = Coupon::percentage("FREE", 10_000);
        assert_eq!(resolve(&coupon, Money::from_cents(1234)).unwrap().cents(), 1234);
    }

    #[test]
    fn test_validate_coupon() {
        assert!(validate_coupon(&Coupon::percentage("OK", 2500)).is_ok());
        assert!(validate_coupon(&Coupon::percentage("  ", 100)).is_err());
        assert!(validate_coupon(&Coupon::percentage("TOO_MUCH", 10_001)).is_err());
        assert!(validate_coupon(&Coupon::fixed("NEG", Money::from_cents(-1))).is_err());
        assert!(validate_coupon(
            &Coupon::fixed("MIN", Money::from_cents(100)).with_minimum_purchase(Money::from_cents(-5))
        )
        .is_err());
        assert!(validate_coupon(&Coupon::fixed("X".repeat(MAX_CODE_LEN + 1), Money::zero())).is_err());
    }

    #[test]
    fn test_code_matching_and_normalizing() {
        let coupon = Coupon::percentage("save10", 1000);
        assert!(code_matches("SAVE10", &coupon));
        assert!(code_matches(" Save10 ", &coupon));
        assert!(!code_matches("SAVE20", &coupon));
        assert_eq!(normalized(&coupon).code, "SAVE10");
    }

    #[test]
    fn test_reresolve_drops_below_minimum() {
        let applied = AppliedCoupon {
            coupon: Coupon::percentage("SAVE10", 1000).with_minimum_purchase(Money::from_cents(10_000)),
            discount: Money::from_cents(1000),
        };
        match reresolve(&applied, Money::from_cents(20_000)) {
            Reresolution::Kept(kept) => assert_eq!(kept.discount.cents(), 2000),
            Reresolution::Dropped => panic!("coupon should stay"),
        }
        assert_eq!(reresolve(&applied, Money::from_cents(5000)), Reresolution::Dropped);
    }
}
