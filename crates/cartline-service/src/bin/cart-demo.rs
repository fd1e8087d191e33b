//! # Cart Demo
//!
//! Walks one shopper through a full cart session and logs every summary.
//!
//! ## Usage
//! ```bash
//! # In-memory store (no Redis needed)
//! cargo run -p cartline-service --bin cart-demo
//!
//! # Against a real Redis
//! CARTLINE_REDIS_URL=redis://127.0.0.1:6379 cargo run -p cartline-service --bin cart-demo
//!
//! # Explicit config file
//! cargo run -p cartline-service --bin cart-demo -- --config ./cart.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use cartline_core::{Cart, Clock, Coupon, Money, NewCartItem, SystemClock};
use cartline_service::{init_tracing, CartConfig, CartService, ServiceResult};
use cartline_store::{CartStore, MemoryCartStore, RedisCartStore};
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    init_tracing("info");

    if let Err(e) = run().await {
        error!(error = %e, "Demo failed");
        std::process::exit(1);
    }
}

async fn run() -> ServiceResult<()> {
    let config = CartConfig::load(parse_config_arg())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn CartStore> = match &config.store.redis_url {
        Some(url) => {
            info!(url = %url, "Using Redis cart store");
            let redis = RedisCartStore::connect_with(
                url,
                &config.store.key_prefix,
                config.operation_timeout(),
            )
            .await?;
            redis.ping().await?;
            Arc::new(redis)
        }
        None => {
            info!("No Redis URL configured, using in-memory store");
            Arc::new(MemoryCartStore::new(clock.clone()).with_prefix(config.store.key_prefix.clone()))
        }
    };

    let service = CartService::new(store, clock, &config)?;
    let user_id = format!("demo-{}", Uuid::new_v4());
    info!(user_id = %user_id, "Starting cart session");

    let cart = service.get_cart(&user_id).await?;
    log_cart("empty", &cart);

    let mut shirt = NewCartItem::new("shirt-001", "Oxford Shirt", Money::from_cents(2999), 1);
    shirt.sku = Some("OXF-BLU-M".to_string());
    service.add_item(&user_id, shirt).await?;

    let update = service
        .add_item(
            &user_id,
            NewCartItem::new("sock-002", "Wool Socks", Money::from_cents(899), 3),
        )
        .await?;
    log_cart("added items", &update.cart);

    let spring = Coupon::percentage("SPRING10", 1000).with_minimum_purchase(Money::from_cents(5000));
    let update = service.apply_coupon(&user_id, "spring10", &spring).await?;
    log_cart("coupon applied", &update.cart);

    let update = service.update_item_quantity(&user_id, "sock-002", 1).await?;
    if update.coupon_removed {
        info!("Coupon dropped: subtotal fell below its minimum");
    }
    log_cart("fewer socks", &update.cart);

    let update = service.remove_item(&user_id, "shirt-001").await?;
    log_cart("shirt removed", &update.cart);

    let update = service.clear_cart(&user_id).await?;
    log_cart("cleared", &update.cart);

    let existed = service.invalidate_cache(&user_id).await?;
    info!(existed, "Cache entry invalidated");

    Ok(())
}

fn log_cart(step: &str, cart: &Cart) {
    let s = &cart.summary;
    info!(
        step,
        version = cart.version,
        lines = cart.line_count(),
        items = s.item_count,
        subtotal = %s.subtotal,
        tax = %s.tax,
        shipping = %s.shipping,
        discount = %s.discount,
        total = %s.total,
        coupon = cart.coupon_code().unwrap_or("-"),
        "Cart"
    );
}

fn parse_config_arg() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}
