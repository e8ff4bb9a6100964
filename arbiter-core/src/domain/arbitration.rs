//! Pure batch classification and winner selection. Everything here is
//! deterministic; the async parts of arbitration (priority lookups,
//! forwarding) live in the application layer.

use crate::domain::intent::Intent;

/// Classification of one key's batch at window expiry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatchOutcome {
    /// One active intent; nothing to arbitrate.
    Single,
    /// Several intents, structurally equal values; redundant submissions.
    Identical,
    /// Values disagree; priority decides.
    Conflict,
}

impl BatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOutcome::Single => "single",
            BatchOutcome::Identical => "identical",
            BatchOutcome::Conflict => "conflict",
        }
    }
}

pub fn classify(batch: &[Intent]) -> Option<BatchOutcome> {
    match batch.len() {
        0 => None,
        1 => Some(BatchOutcome::Single),
        _ if values_identical(batch) => Some(BatchOutcome::Identical),
        _ => Some(BatchOutcome::Conflict),
    }
}

/// True when every value in the batch equals the first, structurally
/// (object key order does not matter).
pub fn values_identical(batch: &[Intent]) -> bool {
    let Some(first) = batch.first() else {
        return true;
    };
    batch.iter().all(|intent| intent.value == first.value)
}

/// Total order used wherever a batch needs one element picked: priority
/// first, then producer timestamp, then intent id. Highest wins, so the
/// ordering is deterministic for any batch regardless of arrival order.
pub fn rank<'a>(intent: &'a Intent, default_priority: i64) -> (i64, u64, &'a str) {
    (intent.priority.unwrap_or(default_priority), intent.timestamp_nanos, intent.intent_id.as_str())
}

/// Winner of a conflicting batch.
pub fn select_winner<'a>(batch: &'a [Intent], default_priority: i64) -> Option<&'a Intent> {
    batch.iter().max_by_key(|intent| rank(intent, default_priority))
}

/// Representative of a single or identical-values batch: latest producer
/// timestamp, intent id as the final criterion.
pub fn select_latest(batch: &[Intent]) -> Option<&Intent> {
    batch.iter().max_by_key(|intent| (intent.timestamp_nanos, intent.intent_id.as_str()))
}
