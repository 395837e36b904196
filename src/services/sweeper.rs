use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::models::cache::ResponseCache;

/// Spawns a task that sweeps stale entries out of `cache` every `period`.
///
/// The first sweep runs one full period after start. The period has nothing
/// to do with midnight; reads already skip stale entries, so the sweep only
/// bounds memory.
pub fn spawn_sweeper(cache: Arc<ResponseCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = cache.sweep();
            info!("Cache sweep removed {} stale entries, {} remain", removed, cache.len());
        }
    })
}
