use crate::foundation::constants::NANOS_PER_SECOND;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as nanoseconds since the Unix epoch.
pub fn now_nanos() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_nanos() as u64).unwrap_or(0)
}

/// Current wall-clock time as float seconds, the unit the wire speaks.
pub fn now_seconds() -> f64 {
    nanos_to_seconds(now_nanos())
}

/// Wire timestamps arrive as float seconds; ranking uses integer nanos.
/// Non-positive and non-finite inputs clamp to zero.
pub fn seconds_to_nanos(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * NANOS_PER_SECOND as f64) as u64
}

pub fn nanos_to_seconds(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_SECOND as f64
}
