use arbiter_core::application::Resolution;
use arbiter_core::domain::BatchOutcome;
use arbiter_core::ArbiterError;
use log::debug;
use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub intents_admitted: u64,
    pub intents_malformed: u64,
    pub resolutions_single: u64,
    pub resolutions_identical: u64,
    pub resolutions_conflict: u64,
    pub commands_ok: u64,
    pub commands_error: u64,
    pub intents_expired: u64,
}

pub struct Metrics {
    registry: Registry,
    intents_total: IntCounterVec,
    resolutions_total: IntCounterVec,
    commands_forwarded_total: IntCounterVec,
    intents_expired_total: IntCounter,
    started_at: Instant,
    intents_admitted: AtomicU64,
    intents_malformed: AtomicU64,
    resolutions_single: AtomicU64,
    resolutions_identical: AtomicU64,
    resolutions_conflict: AtomicU64,
    commands_ok: AtomicU64,
    commands_error: AtomicU64,
    intents_expired: AtomicU64,
}

impl Metrics {
    pub fn new() -> Result<Self, ArbiterError> {
        debug!("initializing prometheus metrics");
        let registry = Registry::new();
        let intents_total = IntCounterVec::new(prometheus::Opts::new("intents_total", "Inbound intents by status"), &["status"])
            .map_err(|err| ArbiterError::Message(err.to_string()))?;
        let resolutions_total =
            IntCounterVec::new(prometheus::Opts::new("resolutions_total", "Resolved batches by outcome"), &["outcome"])
                .map_err(|err| ArbiterError::Message(err.to_string()))?;
        let commands_forwarded_total = IntCounterVec::new(
            prometheus::Opts::new("commands_forwarded_total", "Winning commands pushed to egress by status"),
            &["status"],
        )
        .map_err(|err| ArbiterError::Message(err.to_string()))?;
        let intents_expired_total = IntCounter::new("intents_expired_total", "Intents removed by TTL sweep")
            .map_err(|err| ArbiterError::Message(err.to_string()))?;

        registry.register(Box::new(intents_total.clone())).map_err(|err| ArbiterError::Message(err.to_string()))?;
        registry.register(Box::new(resolutions_total.clone())).map_err(|err| ArbiterError::Message(err.to_string()))?;
        registry.register(Box::new(commands_forwarded_total.clone())).map_err(|err| ArbiterError::Message(err.to_string()))?;
        registry.register(Box::new(intents_expired_total.clone())).map_err(|err| ArbiterError::Message(err.to_string()))?;

        let out = Self {
            registry,
            intents_total,
            resolutions_total,
            commands_forwarded_total,
            intents_expired_total,
            started_at: Instant::now(),
            intents_admitted: AtomicU64::new(0),
            intents_malformed: AtomicU64::new(0),
            resolutions_single: AtomicU64::new(0),
            resolutions_identical: AtomicU64::new(0),
            resolutions_conflict: AtomicU64::new(0),
            commands_ok: AtomicU64::new(0),
            commands_error: AtomicU64::new(0),
            intents_expired: AtomicU64::new(0),
        };
        debug!("prometheus metrics registered metric_count=4");
        Ok(out)
    }

    pub fn inc_intent(&self, status: &str) {
        self.intents_total.with_label_values(&[status]).inc();
        match status {
            "admitted" => {
                self.intents_admitted.fetch_add(1, Ordering::Relaxed);
            }
            "malformed" => {
                self.intents_malformed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn observe_resolution(&self, resolution: &Resolution) {
        let outcome = resolution.outcome.as_str();
        self.resolutions_total.with_label_values(&[outcome]).inc();
        match resolution.outcome {
            BatchOutcome::Single => {
                self.resolutions_single.fetch_add(1, Ordering::Relaxed);
            }
            BatchOutcome::Identical => {
                self.resolutions_identical.fetch_add(1, Ordering::Relaxed);
            }
            BatchOutcome::Conflict => {
                self.resolutions_conflict.fetch_add(1, Ordering::Relaxed);
            }
        }
        let status = if resolution.forwarded { "ok" } else { "error" };
        self.commands_forwarded_total.with_label_values(&[status]).inc();
        if resolution.forwarded {
            self.commands_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commands_error.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_intents_expired(&self, count: u64) {
        self.intents_expired_total.inc_by(count);
        self.intents_expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.started_at.elapsed(),
            intents_admitted: self.intents_admitted.load(Ordering::Relaxed),
            intents_malformed: self.intents_malformed.load(Ordering::Relaxed),
            resolutions_single: self.resolutions_single.load(Ordering::Relaxed),
            resolutions_identical: self.resolutions_identical.load(Ordering::Relaxed),
            resolutions_conflict: self.resolutions_conflict.load(Ordering::Relaxed),
            commands_ok: self.commands_ok.load(Ordering::Relaxed),
            commands_error: self.commands_error.load(Ordering::Relaxed),
            intents_expired: self.intents_expired.load(Ordering::Relaxed),
        }
    }

    pub fn encode(&self) -> Result<String, ArbiterError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| ArbiterError::Message(err.to_string()))?;
        let output = String::from_utf8(buffer).map_err(|err| ArbiterError::Message(err.to_string()))?;
        Ok(output)
    }
}
