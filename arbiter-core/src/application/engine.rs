use crate::application::resolver::PriorityResolver;
use crate::domain::arbitration::{classify, select_latest, select_winner, BatchOutcome};
use crate::domain::{AuditEvent, Command, Intent};
use crate::foundation::util::time::{nanos_to_seconds, now_nanos};
use crate::foundation::{ArbiterError, IntentId, ResolutionKey};
use crate::infrastructure::audit::AuditLogger;
use crate::infrastructure::store::IntentStore;
use crate::infrastructure::transport::CommandSink;
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// What happened when a key's window expired, for callers that count.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub outcome: BatchOutcome,
    pub winner: IntentId,
    pub batch_size: usize,
    pub forwarded: bool,
}

/// Resolves one key's batch at window expiry: takes the batch out of the
/// store, scores it, picks the winner, audits the decision and forwards
/// the command.
///
/// Forwarding is best-effort. The batch is consumed the moment it is
/// taken, so a forwarding failure loses the command rather than stalling
/// or replaying arbitration.
pub struct ArbitrationEngine {
    store: IntentStore,
    resolver: PriorityResolver,
    audit: Arc<dyn AuditLogger>,
    sink: Arc<dyn CommandSink>,
}

impl ArbitrationEngine {
    pub fn new(store: IntentStore, resolver: PriorityResolver, audit: Arc<dyn AuditLogger>, sink: Arc<dyn CommandSink>) -> Self {
        Self { store, resolver, audit, sink }
    }

    pub fn store(&self) -> &IntentStore {
        &self.store
    }

    /// Resolve whatever is pending for `key`. `Ok(None)` means there was
    /// nothing to do (key already emptied by the sweeper, or every intent
    /// expired while the window was open).
    pub async fn resolve_key(&self, key: &ResolutionKey) -> Result<Option<Resolution>, ArbiterError> {
        let taken = self.store.take(key)?;
        if taken.is_empty() {
            trace!("window fired on empty key={}", key);
            return Ok(None);
        }

        let now = now_nanos();
        let (mut batch, expired): (Vec<Intent>, Vec<Intent>) = taken.into_iter().partition(|intent| intent.is_active(now));
        if !expired.is_empty() {
            debug!("excluding {} intents that expired during the window key={}", expired.len(), key);
        }
        if batch.is_empty() {
            return Ok(None);
        }

        self.resolver.score_batch(&mut batch).await;

        let Some(outcome) = classify(&batch) else {
            return Ok(None);
        };
        let winner = match outcome {
            BatchOutcome::Single => &batch[0],
            BatchOutcome::Identical => select_latest(&batch).unwrap_or(&batch[0]),
            BatchOutcome::Conflict => select_winner(&batch, self.resolver.default_priority()).unwrap_or(&batch[0]),
        };
        debug!(
            "batch resolved key={} outcome={} winner={} batch_size={}",
            key,
            outcome.as_str(),
            winner.intent_id,
            batch.len()
        );

        self.audit.log(audit_event(key, outcome, winner, &batch, nanos_to_seconds(now)));

        let command = Command::from_winner(winner, now);
        let forwarded = match self.sink.forward(&command).await {
            Ok(()) => {
                info!("command forwarded key={} intent_id={} outcome={}", key, winner.intent_id, outcome.as_str());
                true
            }
            Err(err) => {
                // Accepted loss: the batch is already consumed and a stale
                // command is worse than a missing one.
                warn!("forwarding failed key={} intent_id={} err={}", key, winner.intent_id, err);
                false
            }
        };

        Ok(Some(Resolution { outcome, winner: winner.intent_id.clone(), batch_size: batch.len(), forwarded }))
    }
}

fn audit_event(key: &ResolutionKey, outcome: BatchOutcome, winner: &Intent, batch: &[Intent], time: f64) -> AuditEvent {
    match outcome {
        BatchOutcome::Single => AuditEvent::SingleIntentForwarded { key: key.to_string(), chosen: winner.record(), time },
        BatchOutcome::Identical => AuditEvent::IdenticalIntents {
            key: key.to_string(),
            chosen: winner.record(),
            fork: batch.iter().map(Intent::record).collect(),
            time,
        },
        BatchOutcome::Conflict => AuditEvent::ConflictResolved {
            key: key.to_string(),
            chosen: winner.record(),
            losers: batch.iter().filter(|intent| intent.intent_id != winner.intent_id).map(Intent::record).collect(),
            all_intents: batch.iter().map(Intent::record).collect(),
            time,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntentDraft;
    use crate::foundation::util::time::now_nanos;
    use crate::foundation::AppId;
    use crate::infrastructure::audit::RecordingAuditLogger;
    use crate::infrastructure::transport::mock::MockCommandSink;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(5);

    fn engine_parts() -> (ArbitrationEngine, RecordingAuditLogger, MockCommandSink) {
        let audit = RecordingAuditLogger::new();
        let sink = MockCommandSink::new();
        let resolver = PriorityResolver::from_table(HashMap::from([(AppId::from("TABLED"), 60)]), 10);
        let engine = ArbitrationEngine::new(IntentStore::default(), resolver, Arc::new(audit.clone()), Arc::new(sink.clone()));
        (engine, audit, sink)
    }

    fn insert(engine: &ArbitrationEngine, app_id: &str, priority: Option<i64>, timestamp: f64, value: Value) -> Intent {
        let draft = IntentDraft {
            app_id: Some(app_id.to_string()),
            target_node: Some("N001".to_string()),
            param: Some("tx_power".to_string()),
            value,
            priority,
            timestamp: Some(timestamp),
            ..Default::default()
        };
        let intent = draft.normalize(now_nanos(), TTL).unwrap();
        engine.store().insert(intent.clone()).unwrap();
        intent
    }

    fn key() -> ResolutionKey {
        ResolutionKey::new("N001", "tx_power")
    }

    #[tokio::test]
    async fn single_intent_forwards_unchanged() {
        let (engine, audit, sink) = engine_parts();
        let intent = insert(&engine, "APP1", Some(100), 10.0, json!({"power_dbm": 20}));

        let resolution = engine.resolve_key(&key()).await.unwrap().unwrap();
        assert_eq!(resolution.outcome, BatchOutcome::Single);
        assert!(resolution.forwarded);

        let commands = sink.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].intent_id, intent.intent_id);
        assert_eq!(commands[0].value, json!({"power_dbm": 20}));
        assert_eq!(commands[0].resolved_by, "conflict_manager");

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AuditEvent::SingleIntentForwarded { .. }));
        assert_eq!(engine.store().pending_intents().unwrap(), 0);
    }

    #[tokio::test]
    async fn conflict_picks_highest_priority() {
        let (engine, audit, sink) = engine_parts();
        insert(&engine, "APP1", Some(100), 10.0, json!({"power_dbm": 20}));
        insert(&engine, "APP2", Some(80), 10.1, json!({"power_dbm": 10}));
        insert(&engine, "APP3", Some(70), 10.2, json!({"power_dbm": 25}));

        let resolution = engine.resolve_key(&key()).await.unwrap().unwrap();
        assert_eq!(resolution.outcome, BatchOutcome::Conflict);
        assert_eq!(resolution.batch_size, 3);

        let commands = sink.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].app_id.as_str(), "APP1");
        assert_eq!(commands[0].value, json!({"power_dbm": 20}));

        match &audit.events()[0] {
            AuditEvent::ConflictResolved { chosen, losers, all_intents, .. } => {
                assert_eq!(chosen.app_id.as_str(), "APP1");
                assert_eq!(losers.len(), 2);
                assert_eq!(all_intents.len(), 3);
            }
            other => panic!("expected conflict_resolved, got {other:?}"),
        }
        assert_eq!(engine.store().pending_intents().unwrap(), 0);
    }

    #[tokio::test]
    async fn identical_values_forward_the_latest() {
        let (engine, audit, sink) = engine_parts();
        insert(&engine, "APP1", Some(100), 10.0, json!({"power_dbm": 20}));
        insert(&engine, "APP2", Some(80), 12.0, json!({"power_dbm": 20}));
        insert(&engine, "APP3", Some(70), 11.0, json!({"power_dbm": 20}));

        let resolution = engine.resolve_key(&key()).await.unwrap().unwrap();
        assert_eq!(resolution.outcome, BatchOutcome::Identical);

        // duplicates are non-conflicting: latest timestamp wins, not priority
        let commands = sink.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].app_id.as_str(), "APP2");

        match &audit.events()[0] {
            AuditEvent::IdenticalIntents { fork, chosen, .. } => {
                assert_eq!(fork.len(), 3);
                assert_eq!(chosen.app_id.as_str(), "APP2");
            }
            other => panic!("expected identical_intents, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_priorities_come_from_table_then_default() {
        let (engine, _audit, sink) = engine_parts();
        insert(&engine, "TABLED", None, 10.0, json!({"power_dbm": 20}));
        insert(&engine, "UNKNOWN", None, 12.0, json!({"power_dbm": 10}));

        engine.resolve_key(&key()).await.unwrap().unwrap();

        // TABLED scores 60 from the table, UNKNOWN gets the default 10
        let commands = sink.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].app_id.as_str(), "TABLED");
    }

    #[tokio::test]
    async fn forwarding_failure_still_consumes_the_batch() {
        let (engine, audit, sink) = engine_parts();
        sink.set_failing(true);
        insert(&engine, "APP1", Some(100), 10.0, json!({"power_dbm": 20}));

        let resolution = engine.resolve_key(&key()).await.unwrap().unwrap();
        assert!(!resolution.forwarded);
        assert!(sink.commands().is_empty());
        // the decision is still audited and the key is cleared
        assert_eq!(audit.events().len(), 1);
        assert_eq!(engine.store().pending_intents().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_key_is_a_noop() {
        let (engine, audit, sink) = engine_parts();
        let resolution = engine.resolve_key(&key()).await.unwrap();
        assert!(resolution.is_none());
        assert!(audit.events().is_empty());
        assert!(sink.commands().is_empty());
    }

    #[tokio::test]
    async fn intents_expired_during_the_window_are_excluded() {
        let (engine, _audit, sink) = engine_parts();

        let stale = IntentDraft {
            app_id: Some("APP1".to_string()),
            target_node: Some("N001".to_string()),
            param: Some("tx_power".to_string()),
            value: json!({"power_dbm": 99}),
            priority: Some(100),
            ttl: Some(0.01),
            ..Default::default()
        };
        engine.store().insert(stale.normalize(now_nanos(), TTL).unwrap()).unwrap();
        insert(&engine, "APP2", Some(80), 10.0, json!({"power_dbm": 10}));

        tokio::time::sleep(Duration::from_millis(30)).await;

        let resolution = engine.resolve_key(&key()).await.unwrap().unwrap();
        assert_eq!(resolution.outcome, BatchOutcome::Single);
        assert_eq!(resolution.batch_size, 1);
        let commands = sink.commands();
        assert_eq!(commands[0].app_id.as_str(), "APP2");
        assert_eq!(commands[0].value, json!({"power_dbm": 10}));
    }
}
