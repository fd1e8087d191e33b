//! # Per-User Locks
//!
//! Serializes read-modify-write cycles on the same cart within one process.
//!
//! ```text
//! user "alice" ──► Arc<Mutex<()>> ◄── second alice request waits here
//! user "bob"   ──► Arc<Mutex<()>>     (never blocked by alice)
//! ```
//!
//! The registry only keeps `Weak` handles, so a user's mutex is freed as soon
//! as no request holds or awaits it. Dead entries are swept whenever a new
//! user is registered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-user async mutexes.
#[derive(Debug, Default)]
pub struct UserLocks {
    handles: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user_id`'s cart.
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        self.handle(user_id).lock_owned().await
    }

    /// Number of users with a live mutex.
    pub fn active(&self) -> usize {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.values().filter(|w| w.strong_count() > 0).count()
    }

    fn handle(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = handles.get(user_id).and_then(Weak::upgrade) {
            return existing;
        }

        handles.retain(|_, w| w.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        handles.insert(user_id.to_string(), Arc::downgrade(&fresh));
        fresh
    }
}
