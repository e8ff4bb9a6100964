use crate::domain::Intent;
use crate::foundation::AppId;
use crate::infrastructure::directory::PriorityDirectory;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Scores intents before arbitration. Resolution order, first match wins:
/// explicit `priority` on the intent, the static table, the remote
/// directory (bounded by `lookup_timeout`), then `default_priority`.
///
/// Lookups touch only the batch being scored; the store and other keys'
/// arbitration are never blocked through here.
pub struct PriorityResolver {
    table: HashMap<AppId, i64>,
    directory: Option<Arc<dyn PriorityDirectory>>,
    lookup_timeout: Duration,
    default_priority: i64,
}

impl PriorityResolver {
    pub fn new(
        table: HashMap<AppId, i64>,
        directory: Option<Arc<dyn PriorityDirectory>>,
        lookup_timeout: Duration,
        default_priority: i64,
    ) -> Self {
        Self { table, directory, lookup_timeout, default_priority }
    }

    /// Table-only resolver, no remote step.
    pub fn from_table(table: HashMap<AppId, i64>, default_priority: i64) -> Self {
        Self { table, directory: None, lookup_timeout: Duration::ZERO, default_priority }
    }

    pub fn default_priority(&self) -> i64 {
        self.default_priority
    }

    /// Fill in `priority` for every intent in the batch that lacks one.
    ///
    /// Remote answers are cached per app_id for the duration of the batch,
    /// so a batch of n duplicates costs one lookup, not n.
    pub async fn score_batch(&self, batch: &mut [Intent]) {
        let mut cache: HashMap<AppId, i64> = HashMap::new();
        for intent in batch.iter_mut() {
            if intent.priority.is_some() {
                continue;
            }
            let priority = match cache.get(&intent.app_id) {
                Some(priority) => *priority,
                None => {
                    let priority = self.score_app(&intent.app_id).await;
                    cache.insert(intent.app_id.clone(), priority);
                    priority
                }
            };
            intent.priority = Some(priority);
        }
    }

    async fn score_app(&self, app_id: &AppId) -> i64 {
        if let Some(priority) = self.table.get(app_id) {
            debug!("priority table hit app_id={} priority={}", app_id, priority);
            return *priority;
        }
        if let Some(priority) = self.lookup(app_id).await {
            return priority;
        }
        self.default_priority
    }

    /// Remote directory step. Timeouts, transport errors and "don't know"
    /// replies all fall through to the default, each logged at its own level.
    async fn lookup(&self, app_id: &AppId) -> Option<i64> {
        let directory = self.directory.as_ref()?;
        if app_id.is_empty() {
            return None;
        }
        match tokio::time::timeout(self.lookup_timeout, directory.app_priority(app_id)).await {
            Ok(Ok(Some(priority))) => {
                debug!("priority directory answered app_id={} priority={}", app_id, priority);
                Some(priority)
            }
            Ok(Ok(None)) => {
                debug!("priority directory has no entry for app_id={}", app_id);
                None
            }
            Ok(Err(err)) => {
                warn!("priority lookup failed app_id={} err={}; using default", app_id, err);
                None
            }
            Err(_) => {
                warn!("priority lookup timed out app_id={} after {:?}; using default", app_id, self.lookup_timeout);
                None
            }
        }
    }
}
