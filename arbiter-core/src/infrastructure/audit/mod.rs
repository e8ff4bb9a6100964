use crate::domain::AuditEvent;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub trait AuditLogger: Send + Sync {
    fn log(&self, event: AuditEvent);
}

/// Emits audit events into the normal log stream: raw JSON at debug, a
/// one-line summary at info.
pub struct StructuredAuditLogger;

impl AuditLogger for StructuredAuditLogger {
    fn log(&self, event: AuditEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(err) => {
                warn!("audit: failed to serialize audit event error={}", err);
                "{\"event\":\"serialize_failed\"}".to_string()
            }
        };
        debug!(target: "arbiter::audit::json", "audit event audit_event={}", json);
        info!(target: "arbiter::audit::human", "audit summary={}", human_summary(&event));
    }
}

/// Append-only JSONL log, one record per resolution. Write failures are
/// logged and swallowed; audit is best-effort by contract.
pub struct FileAuditLogger {
    file: Arc<Mutex<std::fs::File>>,
}

impl FileAuditLogger {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Arc::new(Mutex::new(file)) })
    }
}

impl AuditLogger for FileAuditLogger {
    fn log(&self, event: AuditEvent) {
        use std::io::Write;

        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(err) => {
                warn!("audit: failed to serialize audit event for file logger error={}", err);
                "{\"event\":\"serialize_failed\"}".to_string()
            }
        };
        match self.file.lock() {
            Ok(mut file) => {
                if let Err(err) = writeln!(file, "{}", json) {
                    warn!("audit: failed to write audit event to file error={}", err);
                    return;
                }
                if let Err(err) = file.flush() {
                    warn!("audit: failed to flush audit event to file error={}", err);
                }
            }
            Err(err) => {
                warn!("audit: failed to lock audit file mutex error={}", err);
            }
        }
    }
}

pub struct MultiAuditLogger {
    loggers: Vec<Box<dyn AuditLogger>>,
}

impl MultiAuditLogger {
    pub fn new() -> Self {
        Self { loggers: vec![] }
    }

    pub fn add_logger(&mut self, logger: Box<dyn AuditLogger>) {
        self.loggers.push(logger);
    }
}

impl Default for MultiAuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger for MultiAuditLogger {
    fn log(&self, event: AuditEvent) {
        for logger in &self.loggers {
            logger.log(event.clone());
        }
    }
}

/// Captures events for assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingAuditLogger {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(|err| err.into_inner()).clone()
    }
}

impl AuditLogger for RecordingAuditLogger {
    fn log(&self, event: AuditEvent) {
        self.events.lock().unwrap_or_else(|err| err.into_inner()).push(event);
    }
}

fn human_summary(event: &AuditEvent) -> String {
    match event {
        AuditEvent::SingleIntentForwarded { key, chosen, .. } => {
            format!("AUDIT: single intent forwarded - key={} app={} intent={}", key, chosen.app_id, chosen.intent_id)
        }
        AuditEvent::IdenticalIntents { key, chosen, fork, .. } => {
            format!("AUDIT: identical intents - key={} copies={} forwarded intent={}", key, fork.len(), chosen.intent_id)
        }
        AuditEvent::ConflictResolved { key, chosen, losers, .. } => format!(
            "AUDIT: conflict resolved - key={} winner app={} priority={} losers={}",
            key,
            chosen.app_id,
            chosen.priority.map(|priority| priority.to_string()).unwrap_or_else(|| "-".to_string()),
            losers.len()
        ),
    }
}
