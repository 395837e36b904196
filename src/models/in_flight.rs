use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async locks used to collapse concurrent cache misses into a
/// single upstream call.
#[derive(Default)]
pub struct InFlight {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`, then holds it until the
    /// returned guard is dropped.
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        FlightGuard {
            registry: self,
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

pub struct FlightGuard<'a> {
    registry: &'a InFlight,
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.registry.locks.lock();
        // one reference in the map, one inside our own guard. A waiter
        // cancelled before taking the lock leaves its entry behind until the
        // next acquire of the same key releases it.
        if let Some(lock) = locks.get(&self.key) {
            if Arc::strong_count(lock) <= 2 {
                locks.remove(&self.key);
            }
        }
    }
}
