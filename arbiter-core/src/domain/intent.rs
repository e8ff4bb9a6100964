use crate::foundation::constants::RESOLVED_BY;
use crate::foundation::util::time::{nanos_to_seconds, seconds_to_nanos};
use crate::foundation::{AppId, ArbiterError, IntentId, NodeId, ParamName, ResolutionKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Wire shape of one inbound intent, before validation and normalization.
///
/// Everything is optional at this stage; `normalize` decides what is
/// required and what gets a default.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IntentDraft {
    #[serde(default)]
    pub intent_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub target_node: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub ttl: Option<f64>,
}

impl IntentDraft {
    /// Validate required fields and fill defaults.
    ///
    /// `target_node` and `param` must be present and non-empty; everything
    /// else defaults: a generated `intent_id`, `timestamp` = receipt time,
    /// `ttl` = `default_ttl`. A missing `app_id` normalizes to the empty
    /// string and later resolves to the default priority.
    pub fn normalize(self, received_at_nanos: u64, default_ttl: Duration) -> Result<Intent, ArbiterError> {
        let target_node = match self.target_node.as_deref().map(str::trim) {
            Some(node) if !node.is_empty() => NodeId::from(node),
            _ => return Err(ArbiterError::MalformedIntent("missing target_node".to_string())),
        };
        let param = match self.param.as_deref().map(str::trim) {
            Some(param) if !param.is_empty() => ParamName::from(param),
            _ => return Err(ArbiterError::MalformedIntent("missing param".to_string())),
        };
        let intent_id = match self.intent_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => IntentId::from(id),
            _ => IntentId::from(generate_intent_id()),
        };
        let app_id = AppId::from(self.app_id.as_deref().map(str::trim).unwrap_or_default());
        let timestamp_nanos = match self.timestamp {
            Some(seconds) => seconds_to_nanos(seconds),
            None => received_at_nanos,
        };
        let ttl = match self.ttl {
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => Duration::from_secs_f64(seconds),
            _ => default_ttl,
        };

        Ok(Intent {
            intent_id,
            app_id,
            target_node,
            param,
            value: self.value,
            priority: self.priority,
            timestamp_nanos,
            ttl,
            received_at_nanos,
        })
    }
}

fn generate_intent_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("intent-{}", hex::encode(bytes))
}

/// A normalized intent pending arbitration.
#[derive(Clone, Debug)]
pub struct Intent {
    pub intent_id: IntentId,
    pub app_id: AppId,
    pub target_node: NodeId,
    pub param: ParamName,
    pub value: Value,
    /// Explicit rank, or the cached result of lazy resolution.
    pub priority: Option<i64>,
    /// Producer-supplied logical time, used for tie-breaks.
    pub timestamp_nanos: u64,
    pub ttl: Duration,
    /// Receipt time; the ttl counts from here, never from `timestamp`.
    pub received_at_nanos: u64,
}

impl Intent {
    pub fn key(&self) -> ResolutionKey {
        ResolutionKey { node: self.target_node.clone(), param: self.param.clone() }
    }

    /// Active means the receipt age has not exceeded the ttl.
    pub fn is_active(&self, now_nanos: u64) -> bool {
        now_nanos.saturating_sub(self.received_at_nanos) <= self.ttl.as_nanos() as u64
    }

    /// Wire-shaped rendering for audit records (float seconds, like inbound).
    pub fn record(&self) -> IntentRecord {
        IntentRecord {
            intent_id: self.intent_id.clone(),
            app_id: self.app_id.clone(),
            target_node: self.target_node.clone(),
            param: self.param.clone(),
            value: self.value.clone(),
            priority: self.priority,
            timestamp: nanos_to_seconds(self.timestamp_nanos),
            ttl: self.ttl.as_secs_f64(),
            received_at: nanos_to_seconds(self.received_at_nanos),
        }
    }
}

/// Audit rendering of an intent.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IntentRecord {
    pub intent_id: IntentId,
    pub app_id: AppId,
    pub target_node: NodeId,
    pub param: ParamName,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    pub timestamp: f64,
    pub ttl: f64,
    pub received_at: f64,
}

/// Outbound command envelope built from a winning intent. Emitted at most
/// once, never stored.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Command {
    pub intent_id: IntentId,
    pub app_id: AppId,
    pub target_node: NodeId,
    pub param: ParamName,
    pub value: Value,
    pub resolved_by: String,
    pub ts: f64,
}

impl Command {
    pub fn from_winner(intent: &Intent, now_nanos: u64) -> Self {
        Self {
            intent_id: intent.intent_id.clone(),
            app_id: intent.app_id.clone(),
            target_node: intent.target_node.clone(),
            param: intent.param.clone(),
            value: intent.value.clone(),
            resolved_by: RESOLVED_BY.to_string(),
            ts: nanos_to_seconds(now_nanos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::constants::NANOS_PER_SECOND;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(5);

    fn full_draft() -> IntentDraft {
        IntentDraft {
            intent_id: Some("intent-1".to_string()),
            app_id: Some("APP1".to_string()),
            target_node: Some("N001".to_string()),
            param: Some("tx_power".to_string()),
            value: json!({"power_dbm": 20}),
            priority: Some(100),
            timestamp: Some(10.0),
            ttl: Some(2.5),
        }
    }

    #[test]
    fn normalize_keeps_explicit_fields() {
        let intent = full_draft().normalize(42, TTL).unwrap();
        assert_eq!(intent.intent_id.as_str(), "intent-1");
        assert_eq!(intent.app_id.as_str(), "APP1");
        assert_eq!(intent.key(), ResolutionKey::new("N001", "tx_power"));
        assert_eq!(intent.priority, Some(100));
        assert_eq!(intent.timestamp_nanos, 10 * NANOS_PER_SECOND);
        assert_eq!(intent.ttl, Duration::from_secs_f64(2.5));
        assert_eq!(intent.received_at_nanos, 42);
    }

    #[test]
    fn normalize_fills_defaults() {
        let draft = IntentDraft { target_node: Some("N001".to_string()), param: Some("tx_power".to_string()), ..Default::default() };
        let intent = draft.normalize(1_000, TTL).unwrap();
        assert!(intent.intent_id.as_str().starts_with("intent-"));
        assert_eq!(intent.intent_id.as_str().len(), "intent-".len() + 16);
        assert!(intent.app_id.is_empty());
        assert_eq!(intent.priority, None);
        assert_eq!(intent.timestamp_nanos, 1_000);
        assert_eq!(intent.ttl, TTL);
        assert_eq!(intent.value, Value::Null);
    }

    #[test]
    fn normalize_rejects_missing_required_fields() {
        let no_node = IntentDraft { param: Some("tx_power".to_string()), ..Default::default() };
        assert!(no_node.normalize(0, TTL).is_err());

        let blank_param = IntentDraft { target_node: Some("N001".to_string()), param: Some("  ".to_string()), ..Default::default() };
        assert!(blank_param.normalize(0, TTL).is_err());
    }

    #[test]
    fn generated_ids_differ() {
        let draft = || IntentDraft { target_node: Some("N001".to_string()), param: Some("p".to_string()), ..Default::default() };
        let a = draft().normalize(0, TTL).unwrap();
        let b = draft().normalize(0, TTL).unwrap();
        assert_ne!(a.intent_id, b.intent_id);
    }

    #[test]
    fn active_until_ttl_elapses() {
        let intent = full_draft().normalize(NANOS_PER_SECOND, TTL).unwrap();
        // ttl is 2.5s from receipt at t=1s
        assert!(intent.is_active(NANOS_PER_SECOND));
        assert!(intent.is_active(3 * NANOS_PER_SECOND));
        assert!(!intent.is_active(4 * NANOS_PER_SECOND));
    }

    #[test]
    fn command_envelope_shape() {
        let intent = full_draft().normalize(0, TTL).unwrap();
        let command = Command::from_winner(&intent, 7 * NANOS_PER_SECOND);
        let wire = serde_json::to_value(&command).unwrap();
        assert_eq!(wire["resolved_by"], "conflict_manager");
        assert_eq!(wire["app_id"], "APP1");
        assert_eq!(wire["value"], json!({"power_dbm": 20}));
        assert_eq!(wire["ts"], json!(7.0));
    }

    #[test]
    fn record_converts_to_seconds() {
        let intent = full_draft().normalize(2 * NANOS_PER_SECOND, TTL).unwrap();
        let record = intent.record();
        assert_eq!(record.timestamp, 10.0);
        assert_eq!(record.ttl, 2.5);
        assert_eq!(record.received_at, 2.0);
        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["priority"], json!(100));
    }
}
