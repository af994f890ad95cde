//! Per-user mutual exclusion.
//!
//! Requests for the same user run one at a time; requests for different
//! users only contend on the short table lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Idle entries are pruned once the table reaches this size
const PRUNE_THRESHOLD: usize = 1024;

/// Table of one lock per user identifier
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut table = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        // An entry only the table references is not held or awaited by anyone
        if table.len() >= PRUNE_THRESHOLD {
            let before = table.len();
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            tracing::debug!("Pruned {} idle user locks", before - table.len());
        }

        table
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the user's lock
    ///
    /// A poisoned lock is recovered: it guards no data.
    pub fn with_user<T>(&self, user_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(user_id);
        let _held = lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }

    /// Number of users currently in the lock table
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
