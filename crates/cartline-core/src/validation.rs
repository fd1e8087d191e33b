//! # Validation Module
//!
//! Field-level input rules checked before any cart rule runs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (outside this workspace)                        │
//! │  ├── Deserialization into NewCartItem / Coupon                         │
//! │  └── Auth: supplies user_id                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Identifiers, names, prices, currency                              │
//! │  └── Config values (tax rate)                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: cart rules (crate::cart)                                     │
//! │  ├── Quantity bounds, merge limits, cart size                          │
//! │  └── Summary invariants before persist                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cartline_core::validation::{validate_product_id, validate_currency};
//!
//! validate_product_id("sku-1001").unwrap();
//! validate_currency("USD").unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::NewCartItem;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted identifier (user or product).
pub const MAX_ID_LEN: usize = 128;

/// Longest accepted product name.
pub const MAX_NAME_LEN: usize = 200;

/// Highest accepted unit price: $1,000,000.00.
pub const MAX_PRICE: Money = Money::from_cents(100_000_000);

/// Highest accepted `price × quantity` for one incoming item: $100,000,000.00.
pub const MAX_LINE_TOTAL: Money = Money::from_cents(10_000_000_000);

// =============================================================================
// Identifier Validators
// =============================================================================

fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace or control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a user ID. It becomes part of the cache key.
///
/// ## Example
/// ```rust
/// use cartline_core::validation::validate_user_id;
///
/// assert!(validate_user_id("user-42").is_ok());
/// assert!(validate_user_id("").is_err());
/// assert!(validate_user_id("has space").is_err());
/// ```
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    validate_identifier("userId", user_id)
}

/// Validates a product ID.
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    validate_identifier("productId", product_id)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "productName".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "productName".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an ISO 4217 currency code: three upper-case ASCII letters.
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter ISO 4217 code".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a unit price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - At most [`MAX_PRICE`]
///
/// ## Example
/// ```rust
/// use cartline_core::money::Money;
/// use cartline_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE.cents(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every field of an incoming item except quantity, which the cart
/// rules check against the configured limits.
pub fn validate_new_item(item: &NewCartItem) -> ValidationResult<()> {
    validate_product_id(&item.product_id)?;
    validate_product_name(&item.product_name)?;
    validate_price(item.price)?;
    if item.quantity > 0 {
        let within = item
            .price
            .checked_times(item.quantity)
            .is_some_and(|line| line <= MAX_LINE_TOTAL);
        if !within {
            return Err(ValidationError::OutOfRange {
                field: "line total".to_string(),
                min: 0,
                max: MAX_LINE_TOTAL.cents(),
            });
        }
    }
    if let Some(sku) = &item.sku {
        if sku.len() > MAX_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "sku".to_string(),
                max: MAX_ID_LEN,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifiers() {
        assert!(validate_user_id("u1").is_ok());
        assert!(validate_product_id("COKE-330").is_ok());

        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_product_id("a\tb").is_err());
        assert!(validate_product_id(&"A".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Coffee Mug").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_currency() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("EUR").is_ok());
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("USDX").is_err());
    }

    #[test]
    fn test_validate_price_bounds() {
        assert!(validate_price(MAX_PRICE).is_ok());
        assert!(validate_price(Money::from_cents(MAX_PRICE.cents() + 1)).is_err());
        assert!(matches!(
            validate_price(Money::from_cents(i64::MAX / 2)),
            Err(ValidationError::OutOfRange { max, .. }) if max == MAX_PRICE.cents()
        ));
    }

    #[test]
    fn test_validate_new_item_line_total() {
        let ok = NewCartItem::new("p1", "Ring", MAX_PRICE, 100);
        assert!(validate_new_item(&ok).is_ok());

        let too_much = NewCartItem::new("p1", "Ring", MAX_PRICE, 101);
        assert!(matches!(
            validate_new_item(&too_much),
            Err(ValidationError::OutOfRange { field, .. }) if field == "line total"
        ));

        let free = NewCartItem::new("p2", "Sticker", Money::zero(), i64::MAX);
        assert!(validate_new_item(&free).is_ok());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(825).is_ok());
        assert!(validate_tax_rate_bps(10_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_new_item() {
        let item = NewCartItem::new("p1", "Mug", Money::from_cents(1250), 1);
        assert!(validate_new_item(&item).is_ok());

        let free = NewCartItem::new("p2", "Sticker", Money::zero(), 1);
        assert!(validate_new_item(&free).is_ok());

        let negative = NewCartItem::new("p3", "Refund?", Money::from_cents(-1), 1);
        assert!(matches!(
            validate_new_item(&negative),
            Err(ValidationError::OutOfRange { .. })
        ));

        let nameless = NewCartItem::new("p4", " ", Money::from_cents(100), 1);
        assert!(matches!(
            validate_new_item(&nameless),
            Err(ValidationError::Required { .. })
        ));
    }
}
