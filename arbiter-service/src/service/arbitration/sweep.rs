use crate::service::metrics::Metrics;
use arbiter_core::foundation::util::time::now_nanos;
use arbiter_core::infrastructure::store::IntentStore;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Periodic TTL sweep over the pending store. Keys whose batches empty
/// out are dropped with their last intent, so an expired-only key never
/// lingers as an empty entry.
pub async fn run_sweep_loop(store: IntentStore, metrics: Arc<Metrics>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        match store.sweep_expired(now_nanos()) {
            Ok(stats) => {
                if stats.removed_intents > 0 {
                    debug!("ttl sweep removed_intents={} removed_keys={}", stats.removed_intents, stats.removed_keys);
                    metrics.add_intents_expired(stats.removed_intents as u64);
                }
            }
            Err(err) => warn!("ttl sweep failed error={}", err),
        }
    }
}
