use crate::foundation::constants::{
    DEFAULT_COLLECTION_WINDOW_MS, DEFAULT_INTENT_TTL_SECS, DEFAULT_LOOKUP_TIMEOUT_MS, DEFAULT_PRIORITY, DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::foundation::AppId;
use figment::value::{Dict, Map};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Base configuration for the service process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub data_dir: String,
}

/// Arbitration timing knobs. Wire-facing times stay in the units the
/// config file speaks (ms / float seconds); accessors hand out `Duration`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// Collection window opened by the first intent on a key.
    #[serde(default = "default_collection_window_ms")]
    pub collection_window_ms: u64,
    /// Fallback ttl for intents that do not carry one.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: f64,
    /// Period of the background expiry sweep.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_collection_window_ms() -> u64 {
    DEFAULT_COLLECTION_WINDOW_MS
}

fn default_ttl_seconds() -> f64 {
    DEFAULT_INTENT_TTL_SECS
}

fn default_sweep_interval_seconds() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            collection_window_ms: default_collection_window_ms(),
            default_ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl ArbitrationConfig {
    pub fn collection_window(&self) -> Duration {
        Duration::from_millis(self.collection_window_ms)
    }

    /// Guarded against non-finite TOML values; `Duration::from_secs_f64`
    /// panics on NaN and negatives.
    pub fn default_ttl(&self) -> Duration {
        if self.default_ttl_seconds.is_finite() && self.default_ttl_seconds > 0.0 {
            Duration::from_secs_f64(self.default_ttl_seconds)
        } else {
            Duration::from_secs_f64(DEFAULT_INTENT_TTL_SECS)
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Priority resolution: static table first, then the optional remote
/// directory, then `default_priority`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// Static app_id -> priority entries, e.g. `[priority.table] APP1 = 100`.
    #[serde(default)]
    pub table: HashMap<String, i64>,
    /// Remote priority directory (host:port). Unset disables remote lookups.
    #[serde(default)]
    pub directory_addr: Option<String>,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    #[serde(default = "default_priority")]
    pub default_priority: i64,
}

fn default_lookup_timeout_ms() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MS
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
            directory_addr: None,
            lookup_timeout_ms: default_lookup_timeout_ms(),
            default_priority: default_priority(),
        }
    }
}

impl PriorityConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn typed_table(&self) -> HashMap<AppId, i64> {
        self.table.iter().map(|(app_id, priority)| (AppId::from(app_id.as_str()), *priority)).collect()
    }

    pub fn directory_addr(&self) -> Option<&str> {
        self.directory_addr.as_deref().map(str::trim).filter(|addr| !addr.is_empty())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngressConfig {
    /// Listen address for inbound intent producers.
    #[serde(default)]
    pub listen_addr: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EgressConfig {
    /// Downstream executor that receives winning commands.
    #[serde(default)]
    pub forward_addr: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Audit trail file (defaults to `${data_dir}/conflict_log.jsonl`).
    #[serde(default)]
    pub log_path: Option<String>,
    /// Also mirror audit records into the structured log.
    #[serde(default = "default_structured")]
    pub structured: bool,
}

fn default_structured() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { log_path: None, structured: default_structured() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub arbitration: ArbitrationConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub ingress: IngressConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub audit: AuditConfig,

    /// Profile overrides (e.g. `profiles.lab.*`) - used by the loader.
    #[serde(default, skip_serializing)]
    pub profiles: Option<Map<String, Dict>>,
}

impl AppConfig {
    pub fn audit_log_path(&self) -> PathBuf {
        match self.audit.log_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(&self.service.data_dir).join("conflict_log.jsonl"),
        }
    }
}
