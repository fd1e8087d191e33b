//! # In-Memory Store
//!
//! A [`CartStore`] backed by a `HashMap`, holding the same JSON the Redis
//! store writes. Expiry follows an injected [`Clock`], so tests can jump past
//! the TTL instead of sleeping.
//!
//! Test hooks:
//! - [`MemoryCartStore::insert_raw`] seeds arbitrary bytes (corruption tests)
//! - [`MemoryCartStore::set_unavailable`] makes every call fail like an outage
//! - [`MemoryCartStore::writes`] counts successful writes

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use cartline_core::{Cart, Clock, SystemClock};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{cart_key, decode, encode, CartStore, Revision, Slot, DEFAULT_KEY_PREFIX};

#[derive(Debug, Clone)]
struct Entry {
    raw: String,
    expires_at: DateTime<Utc>,
}

/// In-process cart store.
pub struct MemoryCartStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    prefix: String,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

impl MemoryCartStore {
    /// Creates a store that expires entries by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryCartStore {
            entries: Mutex::new(HashMap::new()),
            clock,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            unavailable: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Overrides the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Stores raw bytes under a user's key, bypassing encoding.
    pub fn insert_raw(&self, user_id: &str, raw: impl Into<String>, ttl: Duration) -> StoreResult<()> {
        let key = cart_key(&self.prefix, user_id)?;
        let expires_at = self.expiry(ttl);
        self.entries().insert(
            key,
            Entry {
                raw: raw.into(),
                expires_at,
            },
        );
        Ok(())
    }

    /// The raw value stored for a user, if live.
    pub fn raw(&self, user_id: &str) -> Option<String> {
        let key = cart_key(&self.prefix, user_id).ok()?;
        self.live(&mut self.entries(), &key)
    }

    /// Time until a user's entry expires, if live.
    pub fn ttl_remaining(&self, user_id: &str) -> Option<Duration> {
        let key = cart_key(&self.prefix, user_id).ok()?;
        let now = self.clock.now();
        let entries = self.entries();
        let entry = entries.get(&key).filter(|e| e.expires_at > now)?;
        (entry.expires_at - now).to_std().ok()
    }

    /// Simulates a cache outage.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_up(&self, op: &str) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{} failed: connection refused", op)));
        }
        Ok(())
    }

    fn expiry(&self, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self.clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns the live value for `key`, dropping it if expired.
    fn live(&self, entries: &mut HashMap<String, Entry>, key: &str) -> Option<String> {
        let now = self.clock.now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.raw.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn write(&self, entries: &mut HashMap<String, Entry>, key: String, raw: String, ttl: Duration) {
        let expires_at = self.expiry(ttl);
        entries.insert(key, Entry { raw, expires_at });
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryCartStore {
    fn default() -> Self {
        MemoryCartStore::new(Arc::new(SystemClock))
    }
}

fn matches_revision(current: Option<&str>, expected: &Revision) -> bool {
    match (expected, current) {
        (Revision::Absent, None) => true,
        (Revision::Raw(raw), Some(current)) => raw == current,
        (Revision::Version(v), Some(current)) => serde_json::from_str::<Cart>(current)
            .map(|cart| cart.version == *v)
            .unwrap_or(false),
        _ => false,
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self, user_id: &str) -> StoreResult<Slot> {
        self.check_up("GET")?;
        let key = cart_key(&self.prefix, user_id)?;
        let raw = self.live(&mut self.entries(), &key);
        Ok(decode(&key, raw))
    }

    async fn set(&self, user_id: &str, cart: &Cart, ttl: Duration) -> StoreResult<()> {
        self.check_up("SET")?;
        let key = cart_key(&self.prefix, user_id)?;
        let raw = encode(cart)?;
        self.write(&mut self.entries(), key, raw, ttl);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        user_id: &str,
        expected: &Revision,
        cart: &Cart,
        ttl: Duration,
    ) -> StoreResult<bool> {
        self.check_up("EVAL")?;
        let key = cart_key(&self.prefix, user_id)?;
        let raw = encode(cart)?;

        let mut entries = self.entries();
        let current = self.live(&mut entries, &key);
        if !matches_revision(current.as_deref(), expected) {
            debug!(key = %key, ?expected, "Compare-and-set rejected");
            return Ok(false);
        }
        self.write(&mut entries, key, raw, ttl);
        Ok(true)
    }

    async fn delete(&self, user_id: &str) -> StoreResult<bool> {
        self.check_up("DEL")?;
        let key = cart_key(&self.prefix, user_id)?;
        let mut entries = self.entries();
        let existed = self.live(&mut entries, &key).is_some();
        entries.remove(&key);
        Ok(existed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
