use crate::domain::intent::IntentRecord;
use serde::{Deserialize, Serialize};

/// One resolution outcome, as appended to the audit log.
///
/// `key` is the resolution key rendered as `node/param`; `time` is the
/// wall-clock resolution time in seconds.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    SingleIntentForwarded {
        key: String,
        chosen: IntentRecord,
        time: f64,
    },
    IdenticalIntents {
        key: String,
        chosen: IntentRecord,
        /// The full duplicate set, chosen included.
        fork: Vec<IntentRecord>,
        time: f64,
    },
    ConflictResolved {
        key: String,
        chosen: IntentRecord,
        losers: Vec<IntentRecord>,
        all_intents: Vec<IntentRecord>,
        time: f64,
    },
}

impl AuditEvent {
    pub fn key(&self) -> &str {
        match self {
            AuditEvent::SingleIntentForwarded { key, .. } => key,
            AuditEvent::IdenticalIntents { key, .. } => key,
            AuditEvent::ConflictResolved { key, .. } => key,
        }
    }

    pub fn chosen(&self) -> &IntentRecord {
        match self {
            AuditEvent::SingleIntentForwarded { chosen, .. } => chosen,
            AuditEvent::IdenticalIntents { chosen, .. } => chosen,
            AuditEvent::ConflictResolved { chosen, .. } => chosen,
        }
    }
}
