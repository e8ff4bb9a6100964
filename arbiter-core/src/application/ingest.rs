use crate::application::window::WindowScheduler;
use crate::domain::IntentDraft;
use crate::foundation::util::time::now_nanos;
use crate::foundation::{ArbiterError, IntentId, ResolutionKey};
use crate::infrastructure::store::IntentStore;
use log::{trace, warn};
use std::time::Duration;

/// Outcome of admitting one draft, for callers that count.
#[derive(Clone, Debug)]
pub struct Admission {
    pub intent_id: IntentId,
    pub key: ResolutionKey,
    pub batch_len: usize,
    pub opened_window: bool,
}

/// Receiving side of the pipeline: normalize a draft, store it, and make
/// sure its key has a collection window running.
#[derive(Clone)]
pub struct IntentIngest {
    store: IntentStore,
    scheduler: WindowScheduler,
    default_ttl: Duration,
}

impl IntentIngest {
    pub fn new(store: IntentStore, scheduler: WindowScheduler, default_ttl: Duration) -> Self {
        Self { store, scheduler, default_ttl }
    }

    /// Admit one inbound draft. Malformed drafts are dropped here, `Ok(None)`;
    /// the fire-and-forget ingress has no reply path, so the drop is only
    /// logged.
    ///
    /// The intent is stored before the window is opened, so a firing window
    /// can never race ahead of its own first intent.
    pub fn admit(&self, draft: IntentDraft) -> Result<Option<Admission>, ArbiterError> {
        let received_at = now_nanos();
        let intent = match draft.normalize(received_at, self.default_ttl) {
            Ok(intent) => intent,
            Err(err) => {
                warn!("dropping malformed intent: {}", err);
                return Ok(None);
            }
        };

        let key = intent.key();
        let intent_id = intent.intent_id.clone();
        let batch_len = self.store.insert(intent)?;
        let opened_window = self.scheduler.note_arrival(key.clone());
        trace!("intent admitted intent_id={} key={} batch_len={} opened_window={}", intent_id, key, batch_len, opened_window);

        Ok(Some(Admission { intent_id, key, batch_len, opened_window }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WINDOW: Duration = Duration::from_millis(50);
    const TTL: Duration = Duration::from_secs(5);

    fn draft(node: &str, param: &str) -> IntentDraft {
        IntentDraft {
            app_id: Some("APP1".to_string()),
            target_node: Some(node.to_string()),
            param: Some(param.to_string()),
            value: json!(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn admits_and_opens_one_window_per_burst() {
        let (scheduler, _fired) = WindowScheduler::new(WINDOW);
        let store = IntentStore::default();
        let ingest = IntentIngest::new(store.clone(), scheduler, TTL);

        let first = ingest.admit(draft("N001", "tx_power")).unwrap().unwrap();
        assert!(first.opened_window);
        assert_eq!(first.batch_len, 1);

        let second = ingest.admit(draft("N001", "tx_power")).unwrap().unwrap();
        assert!(!second.opened_window);
        assert_eq!(second.batch_len, 2);

        assert_eq!(store.pending_intents().unwrap(), 2);
    }

    #[tokio::test]
    async fn malformed_draft_is_dropped() {
        let (scheduler, _fired) = WindowScheduler::new(WINDOW);
        let store = IntentStore::default();
        let ingest = IntentIngest::new(store.clone(), scheduler.clone(), TTL);

        let missing_param = IntentDraft { target_node: Some("N001".to_string()), ..Default::default() };
        assert!(ingest.admit(missing_param).unwrap().is_none());
        assert_eq!(store.pending_intents().unwrap(), 0);
        assert_eq!(scheduler.open_windows(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_open_distinct_windows() {
        let (scheduler, _fired) = WindowScheduler::new(WINDOW);
        let ingest = IntentIngest::new(IntentStore::default(), scheduler.clone(), TTL);

        assert!(ingest.admit(draft("N001", "tx_power")).unwrap().unwrap().opened_window);
        assert!(ingest.admit(draft("N001", "scheduling_weight")).unwrap().unwrap().opened_window);
        assert!(ingest.admit(draft("N002", "tx_power")).unwrap().unwrap().opened_window);
        assert_eq!(scheduler.open_windows(), 3);
    }
}
