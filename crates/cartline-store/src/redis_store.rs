//! # Redis Store
//!
//! [`CartStore`] over Redis using a tokio `ConnectionManager`, which
//! reconnects on its own after a dropped connection.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load             GET cart:{userId}                                     │
//! │  set              SET cart:{userId} <json> EX <ttl>                     │
//! │  compare_and_set  EVAL <cas script> 1 cart:{userId} mode ref json ttl   │
//! │  delete           DEL cart:{userId}                                     │
//! │  ping             PING                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call is bounded by the operation timeout. A timeout, like any redis
//! error, becomes [`StoreError::Unavailable`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use cartline_core::Cart;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{cart_key, decode, encode, CartStore, Revision, Slot, DEFAULT_KEY_PREFIX};

/// Default bound on a single cache round trip.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(500);

/// Atomic compare-and-set.
///
/// KEYS[1] = cart key
/// ARGV[1] = mode: "absent" | "raw" | "version"
/// ARGV[2] = raw bytes or version number to match
/// ARGV[3] = new JSON
/// ARGV[4] = TTL seconds
///
/// Returns 1 if written, 0 if the stored state did not match.
const CAS_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
local mode = ARGV[1]
if mode == 'absent' then
    if current then return 0 end
elseif mode == 'raw' then
    if current ~= ARGV[2] then return 0 end
else
    if not current then return 0 end
    local ok, doc = pcall(cjson.decode, current)
    if not ok or type(doc) ~= 'table' then return 0 end
    if (tonumber(doc.version) or 0) ~= tonumber(ARGV[2]) then return 0 end
end
redis.call('SET', KEYS[1], ARGV[3], 'EX', ARGV[4])
return 1
";

/// Script arguments `(mode, reference)` for an expected revision.
fn cas_args(expected: &Revision) -> (&'static str, String) {
    match expected {
        Revision::Absent => ("absent", String::new()),
        Revision::Raw(raw) => ("raw", raw.clone()),
        Revision::Version(v) => ("version", v.to_string()),
    }
}

/// Redis EX takes whole seconds and rejects 0.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Redis-backed cart store.
#[derive(Clone)]
pub struct RedisCartStore {
    conn: ConnectionManager,
    prefix: String,
    timeout: Duration,
    cas: Script,
}

impl RedisCartStore {
    /// Connects to Redis at `url`.
    ///
    /// ## Errors
    /// [`StoreError::Unavailable`] if the URL is invalid or the server does not
    /// answer within the operation timeout.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        Self::connect_with(url, DEFAULT_KEY_PREFIX, DEFAULT_OPERATION_TIMEOUT).await
    }

    /// Connects with an explicit key prefix and operation timeout.
    pub async fn connect_with(url: &str, prefix: &str, timeout: Duration) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::timed_out("CONNECT"))??;

        info!(prefix = %prefix, timeout_ms = timeout.as_millis() as u64, "Connected to Redis");

        Ok(RedisCartStore {
            conn,
            prefix: prefix.to_string(),
            timeout,
            cas: Script::new(CAS_SCRIPT),
        })
    }

    /// Round-trips a PING.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = self
            .bounded("PING", async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(())
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::timed_out(op)),
        }
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn load(&self, user_id: &str) -> StoreResult<Slot> {
        let key = cart_key(&self.prefix, user_id)?;
        let mut conn = self.conn.clone();
        let raw: Option<String> = self.bounded("GET", conn.get(&key)).await?;
        Ok(decode(&key, raw))
    }

    async fn set(&self, user_id: &str, cart: &Cart, ttl: Duration) -> StoreResult<()> {
        let key = cart_key(&self.prefix, user_id)?;
        let json = encode(cart)?;
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded("SET", conn.set_ex(&key, json, ttl_secs(ttl)))
            .await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        user_id: &str,
        expected: &Revision,
        cart: &Cart,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let key = cart_key(&self.prefix, user_id)?;
        let json = encode(cart)?;
        let (mode, reference) = cas_args(expected);
        let mut conn = self.conn.clone();

        let mut invocation = self.cas.key(&key);
        invocation.arg(mode).arg(reference).arg(json).arg(ttl_secs(ttl));
        let written: i64 = self
            .bounded("EVAL", invocation.invoke_async(&mut conn))
            .await?;

        if written == 0 {
            debug!(key = %key, ?expected, "Compare-and-set rejected");
        }
        Ok(written == 1)
    }

    async fn delete(&self, user_id: &str) -> StoreResult<bool> {
        let key = cart_key(&self.prefix, user_id)?;
        let mut conn = self.conn.clone();
        let removed: i64 = self.bounded("DEL", conn.del(&key)).await?;
        Ok(removed > 0)
    }
}
