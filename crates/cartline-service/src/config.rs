//! # Cart Configuration
//!
//! Tax, shipping, cart limits and store settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARTLINE_TAX_RATE_BPS=825                                          │
//! │     CARTLINE_REDIS_URL=redis://cache:6379/                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cartline/cart.toml (Linux)                               │
//! │     ~/Library/Application Support/com.cartline.cartline/cart.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     no tax, no shipping, 7-day TTL, in-memory store                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # cart.toml
//! [pricing]
//! tax_rate_bps = 825      # 8.25%
//! currency = "USD"
//!
//! [shipping]
//! flat_fee_cents = 599
//! free_threshold_cents = 5000
//! free = false
//!
//! [cart]
//! ttl_secs = 604800       # 7 days, sliding
//! max_items = 100
//! max_item_quantity = 999
//! max_conflict_retries = 5
//!
//! [store]
//! redis_url = "redis://127.0.0.1:6379/"
//! key_prefix = "cart"
//! operation_timeout_ms = 500
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cartline_core::validation::{validate_currency, validate_tax_rate_bps};
use cartline_core::{
    CartLimits, Money, PricingPolicy, ShippingPolicy, TaxRate, DEFAULT_CART_TTL_SECS,
    DEFAULT_CURRENCY, MAX_CART_ITEMS, MAX_ITEM_QUANTITY,
};
use cartline_store::DEFAULT_KEY_PREFIX;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};

/// Largest accepted `cart.max_items`.
pub const MAX_ITEMS_CEILING: usize = MAX_CART_ITEMS * 100;

/// Largest accepted `cart.max_item_quantity`.
pub const MAX_QUANTITY_CEILING: i64 = MAX_ITEM_QUANTITY * 1000;

// =============================================================================
// Sections
// =============================================================================

/// `[pricing]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Tax in basis points (825 = 8.25%).
    #[serde(default)]
    pub tax_rate_bps: u32,

    /// Currency stamped on new carts.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate_bps: 0,
            currency: default_currency(),
        }
    }
}

/// `[shipping]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSettings {
    /// Charged on non-empty carts below the threshold.
    #[serde(default)]
    pub flat_fee_cents: i64,

    /// Subtotal at or above which shipping is free.
    #[serde(default)]
    pub free_threshold_cents: Option<i64>,

    /// Never charge shipping.
    #[serde(default)]
    pub free: bool,
}

/// `[cart]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSettings {
    /// Sliding expiry of an idle cart (seconds).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_max_items")]
    pub max_items: usize,

    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,

    /// Reload-and-reapply attempts after losing a compare-and-set.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CART_TTL_SECS
}
fn default_max_items() -> usize {
    MAX_CART_ITEMS
}
fn default_max_item_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}
fn default_max_conflict_retries() -> u32 {
    5
}

impl Default for CartSettings {
    fn default() -> Self {
        CartSettings {
            ttl_secs: default_ttl_secs(),
            max_items: default_max_items(),
            max_item_quantity: default_max_item_quantity(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

/// `[store]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Redis URL. None means the in-memory store.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}
fn default_operation_timeout_ms() -> u64 {
    500
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            redis_url: None,
            key_prefix: default_key_prefix(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

// =============================================================================
// Cart Config
// =============================================================================

/// Complete Cartline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub cart: CartSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl CartConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`cart.toml`), if it exists
    /// 3. `CARTLINE_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading cart config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without env overrides or validation.
    pub fn from_file(path: &Path) -> ServiceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        validate_tax_rate_bps(self.pricing.tax_rate_bps).map_err(invalid)?;
        validate_currency(&self.pricing.currency).map_err(invalid)?;

        if self.shipping.flat_fee_cents < 0 {
            return Err(invalid("shipping.flat_fee_cents must not be negative"));
        }
        if self.shipping.free_threshold_cents.is_some_and(|t| t < 0) {
            return Err(invalid("shipping.free_threshold_cents must not be negative"));
        }
        if self.cart.ttl_secs == 0 {
            return Err(invalid("cart.ttl_secs must be greater than 0"));
        }
        if self.cart.max_items == 0 || self.cart.max_items > MAX_ITEMS_CEILING {
            return Err(invalid(format!(
                "cart.max_items must be between 1 and {}",
                MAX_ITEMS_CEILING
            )));
        }
        if self.cart.max_item_quantity < 1 || self.cart.max_item_quantity > MAX_QUANTITY_CEILING {
            return Err(invalid(format!(
                "cart.max_item_quantity must be between 1 and {}",
                MAX_QUANTITY_CEILING
            )));
        }
        if self.store.key_prefix.is_empty() {
            return Err(invalid("store.key_prefix must not be empty"));
        }
        if self.store.operation_timeout_ms == 0 {
            return Err(invalid("store.operation_timeout_ms must be greater than 0"));
        }
        if let Some(ref url) = self.store.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(invalid(format!(
                    "Redis URL must start with redis:// or rediss://, got: {}",
                    url
                )));
            }
        }
        Ok(())
    }

    /// Applies `CARTLINE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bps) = parsed(&lookup, "CARTLINE_TAX_RATE_BPS") {
            debug!(tax_rate_bps = bps, "Overriding tax rate from environment");
            self.pricing.tax_rate_bps = bps;
        }

        if let Some(currency) = lookup("CARTLINE_CURRENCY") {
            self.pricing.currency = currency;
        }

        if let Some(fee) = parsed(&lookup, "CARTLINE_SHIPPING_FEE_CENTS") {
            self.shipping.flat_fee_cents = fee;
        }

        if let Some(threshold) = parsed(&lookup, "CARTLINE_FREE_SHIPPING_THRESHOLD_CENTS") {
            self.shipping.free_threshold_cents = Some(threshold);
        }

        if let Some(ttl) = parsed(&lookup, "CARTLINE_CART_TTL_SECS") {
            self.cart.ttl_secs = ttl;
        }

        if let Some(url) = lookup("CARTLINE_REDIS_URL") {
            debug!(url = %url, "Overriding Redis URL from environment");
            self.store.redis_url = Some(url);
        }

        if let Some(prefix) = lookup("CARTLINE_KEY_PREFIX") {
            self.store.key_prefix = prefix;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cartline", "cartline")
            .map(|dirs| dirs.config_dir().join("cart.toml"))
    }

    // =========================================================================
    // Typed Views
    // =========================================================================

    /// Tax and shipping as the pricing engine consumes them.
    pub fn pricing_policy(&self) -> PricingPolicy {
        let shipping = if self.shipping.free {
            ShippingPolicy::free()
        } else {
            let flat = ShippingPolicy::flat(Money::from_cents(self.shipping.flat_fee_cents));
            match self.shipping.free_threshold_cents {
                Some(t) => flat.with_free_threshold(Money::from_cents(t)),
                None => flat,
            }
        };
        PricingPolicy::new(TaxRate::from_bps(self.pricing.tax_rate_bps), shipping)
    }

    pub fn limits(&self) -> CartLimits {
        CartLimits {
            max_items: self.cart.max_items,
            max_item_quantity: self.cart.max_item_quantity,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cart.ttl_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.store.operation_timeout_ms)
    }
}

fn invalid(msg: impl ToString) -> ServiceError {
    ServiceError::Config(msg.to_string())
}

fn parsed<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CartConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cart.ttl_secs, 604_800);
        assert_eq!(config.cart.max_items, 100);
        assert_eq!(config.cart.max_item_quantity, 999);
        assert_eq!(config.store.key_prefix, "cart");
        assert!(config.store.redis_url.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CartConfig = toml::from_str(
            r#"
            [pricing]
            tax_rate_bps = 825

            [shipping]
            flat_fee_cents = 599
            free_threshold_cents = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.tax_rate_bps, 825);
        assert_eq!(config.pricing.currency, "USD");
        assert_eq!(config.cart.max_conflict_retries, 5);

        let policy = config.pricing_policy();
        assert_eq!(policy.tax_rate.bps(), 825);
        assert_eq!(
            policy.shipping,
            ShippingPolicy::flat(Money::from_cents(599)).with_free_threshold(Money::from_cents(5000))
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CARTLINE_TAX_RATE_BPS", "700"),
            ("CARTLINE_CURRENCY", "EUR"),
            ("CARTLINE_SHIPPING_FEE_CENTS", "450"),
            ("CARTLINE_FREE_SHIPPING_THRESHOLD_CENTS", "10000"),
            ("CARTLINE_CART_TTL_SECS", "3600"),
            ("CARTLINE_REDIS_URL", "redis://cache:6379/"),
            ("CARTLINE_KEY_PREFIX", "shop:cart"),
        ]
        .into_iter()
        .collect();

        let mut config = CartConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.pricing.tax_rate_bps, 700);
        assert_eq!(config.pricing.currency, "EUR");
        assert_eq!(config.shipping.flat_fee_cents, 450);
        assert_eq!(config.shipping.free_threshold_cents, Some(10_000));
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert_eq!(config.store.redis_url.as_deref(), Some("redis://cache:6379/"));
        assert_eq!(config.store.key_prefix, "shop:cart");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let mut config = CartConfig::default();
        config.apply_overrides(|name| (name == "CARTLINE_TAX_RATE_BPS").then(|| "lots".to_string()));
        assert_eq!(config.pricing.tax_rate_bps, 0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CartConfig::default();

        config.pricing.tax_rate_bps = 10_001;
        assert!(config.validate().is_err());
        config.pricing.tax_rate_bps = 825;

        config.pricing.currency = "dollars".into();
        assert!(config.validate().is_err());
        config.pricing.currency = "USD".into();

        config.store.redis_url = Some("http://cache".into());
        assert!(config.validate().unwrap_err().is_config_error());
        config.store.redis_url = Some("redis://cache/".into());
        assert!(config.validate().is_ok());

        config.cart.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cart_limits_are_capped() {
        let mut config = CartConfig::default();

        config.cart.max_item_quantity = MAX_QUANTITY_CEILING;
        assert!(config.validate().is_ok());
        config.cart.max_item_quantity = i64::MAX;
        assert!(config.validate().unwrap_err().is_config_error());
        config.cart.max_item_quantity = 999;

        config.cart.max_items = MAX_ITEMS_CEILING + 1;
        assert!(config.validate().is_err());
        config.cart.max_items = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_free_shipping_flag_wins() {
        let mut config = CartConfig::default();
        config.shipping.flat_fee_cents = 999;
        config.shipping.free = true;
        assert_eq!(config.pricing_policy().shipping, ShippingPolicy::free());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("cartline-missing-{}.toml", std::process::id()));
        let config = CartConfig::load(Some(path)).unwrap();
        assert_eq!(config.cart.max_items, 100);
    }
}
