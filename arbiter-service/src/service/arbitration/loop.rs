use crate::service::arbitration::sweep::run_sweep_loop;
use crate::service::flow::ServiceFlow;
use arbiter_core::foundation::ResolutionKey;
use arbiter_core::infrastructure::config::AppConfig;
use arbiter_core::infrastructure::transport::IntentSource;
use arbiter_core::ArbiterError;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Core service loop: admit inbound drafts, resolve keys whose collection
/// window fired, and keep the TTL sweeper running in the background.
///
/// Each fired key is resolved on its own task. A resolution can block on a
/// directory lookup for up to the configured timeout, and ingestion must
/// not stall behind it.
pub async fn run_arbitration_loop(
    app_config: Arc<AppConfig>,
    flow: Arc<ServiceFlow>,
    source: Arc<dyn IntentSource>,
    mut fired_rx: mpsc::UnboundedReceiver<ResolutionKey>,
) -> Result<(), ArbiterError> {
    let mut subscription = source.subscribe().await?;

    info!(
        "arbitration loop started collection_window_ms={} default_ttl_seconds={} sweep_interval_seconds={} default_priority={} table_entries={} directory_addr_set={}",
        app_config.arbitration.collection_window_ms,
        app_config.arbitration.default_ttl_seconds,
        app_config.arbitration.sweep_interval_seconds,
        app_config.priority.default_priority,
        app_config.priority.table.len(),
        app_config.priority.directory_addr().is_some()
    );

    struct AbortOnDrop(tokio::task::JoinHandle<()>);

    impl Drop for AbortOnDrop {
        fn drop(&mut self) {
            self.0.abort();
        }
    }

    let sweep = tokio::spawn(run_sweep_loop(flow.store(), flow.metrics(), app_config.arbitration.sweep_interval()));
    let _sweep_guard = AbortOnDrop(sweep);

    let ingest = flow.ingest();
    let metrics = flow.metrics();

    let mut last_activity = Instant::now();
    let mut idle_ticker = tokio::time::interval(Duration::from_secs(60));
    idle_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = idle_ticker.tick() => {
                let idle = last_activity.elapsed();
                if idle >= Duration::from_secs(60) {
                    info!(
                        "arbiter idle, waiting for intents idle_seconds={} open_windows={} pending_intents={}",
                        idle.as_secs(),
                        flow.scheduler().open_windows(),
                        flow.store().pending_intents().unwrap_or(0)
                    );
                }
            }
            key = fired_rx.recv() => {
                // The scheduler holds a sender clone, so this channel only
                // closes when the flow itself is torn down.
                let Some(key) = key else { break; };
                last_activity = Instant::now();
                let engine = flow.engine();
                let metrics_for_key = flow.metrics();
                tokio::spawn(async move {
                    match engine.resolve_key(&key).await {
                        Ok(Some(resolution)) => metrics_for_key.observe_resolution(&resolution),
                        Ok(None) => {}
                        Err(err) => warn!("resolution failed key={} error={}", key, err),
                    }
                });
            }
            item = subscription.next() => {
                let Some(item) = item else { break; };
                let draft = match item {
                    Ok(draft) => {
                        last_activity = Instant::now();
                        draft
                    }
                    Err(err) => {
                        warn!("intent stream error error={}", err);
                        continue;
                    }
                };

                match ingest.admit(draft) {
                    Ok(Some(admission)) => {
                        metrics.inc_intent("admitted");
                        debug!(
                            "intent admitted intent_id={} key={} batch_len={} opened_window={}",
                            admission.intent_id,
                            admission.key,
                            admission.batch_len,
                            admission.opened_window
                        );
                    }
                    Ok(None) => {
                        metrics.inc_intent("malformed");
                    }
                    Err(err) => warn!("intent admission error error={}", err),
                }
            }
        }
    }

    Ok(())
}
