//! System-wide constants for intent arbitration.

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Collection window in milliseconds.
///
/// How long a key's first pending intent waits for near-simultaneous
/// competitors before arbitration runs. Fixed, not sliding: late arrivals
/// join the batch but never extend the window.
pub const DEFAULT_COLLECTION_WINDOW_MS: u64 = 300;

/// Default intent time-to-live in seconds.
///
/// Applied when a producer sends no `ttl`. An intent older than its ttl is
/// never arbitrated and is eventually swept.
pub const DEFAULT_INTENT_TTL_SECS: f64 = 5.0;

/// Expiry sweep period in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 1;

/// Remote priority lookup timeout in milliseconds.
///
/// A lookup that exceeds this falls through to the default priority; there
/// is no retry.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 500;

/// Priority assigned when no explicit, static, or remote priority exists.
///
/// Kept below every static-table entry so unknown applications always lose
/// a conflict against registered ones.
pub const DEFAULT_PRIORITY: i64 = 10;

/// Resolver identity stamped on every outbound command envelope.
pub const RESOLVED_BY: &str = "conflict_manager";

/// Hard cap on one inbound wire line (64 KB).
pub const MAX_WIRE_LINE_BYTES: usize = 64 * 1024;

#[cfg(test)]
pub mod test {
    /// Short collection window for tests (milliseconds).
    pub const TEST_WINDOW_MS: u64 = 50;

    /// Short intent ttl for expiry tests (seconds).
    pub const TEST_TTL_SECS: f64 = 0.05;
}
