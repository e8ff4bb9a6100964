//! Priority directory: the optional registration collaborator consulted
//! when neither the intent nor the static table carries a priority.

mod tcp;

pub use tcp::TcpDirectory;

use crate::foundation::{AppId, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Request type marker on the lookup wire.
pub const GET_APP_PRIORITY: &str = "GET_APP_PRIORITY";

#[async_trait]
pub trait PriorityDirectory: Send + Sync {
    /// `Ok(None)` means the directory answered but knows no priority for
    /// this application. The caller applies its own timeout.
    async fn app_priority(&self, app_id: &AppId) -> Result<Option<i64>>;
}

/// Lookup request wire shape.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PriorityRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub app_id: AppId,
}

impl PriorityRequest {
    pub fn new(app_id: AppId) -> Self {
        Self { kind: GET_APP_PRIORITY.to_string(), app_id }
    }
}

/// Lookup reply wire shape; anything that fails to parse as this is
/// treated as "no answer".
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PriorityReply {
    pub priority: i64,
}

/// In-memory directory for tests and single-process deployments. Records
/// the queries it serves so tests can assert on lookup traffic.
#[derive(Default)]
pub struct TableDirectory {
    entries: Mutex<HashMap<AppId, i64>>,
    queries: Mutex<Vec<AppId>>,
}

impl TableDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, app_id: impl Into<AppId>, priority: i64) {
        self.entries.lock().unwrap_or_else(|err| err.into_inner()).insert(app_id.into(), priority);
    }

    pub fn queries(&self) -> Vec<AppId> {
        self.queries.lock().unwrap_or_else(|err| err.into_inner()).clone()
    }
}

#[async_trait]
impl PriorityDirectory for TableDirectory {
    async fn app_priority(&self, app_id: &AppId) -> Result<Option<i64>> {
        self.queries.lock().unwrap_or_else(|err| err.into_inner()).push(app_id.clone());
        Ok(self.entries.lock().unwrap_or_else(|err| err.into_inner()).get(app_id).copied())
    }
}
