use crate::service::metrics::Metrics;
use arbiter_core::application::{ArbitrationEngine, IntentIngest, PriorityResolver, WindowScheduler};
use arbiter_core::foundation::ResolutionKey;
use arbiter_core::infrastructure::audit::AuditLogger;
use arbiter_core::infrastructure::config::AppConfig;
use arbiter_core::infrastructure::directory::PriorityDirectory;
use arbiter_core::infrastructure::store::IntentStore;
use arbiter_core::infrastructure::transport::CommandSink;
use arbiter_core::ArbiterError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wires the store, window scheduler, ingest path, and engine from one
/// config. The receiver returned alongside carries fired window keys and
/// belongs to the arbitration loop.
pub struct ServiceFlow {
    store: IntentStore,
    scheduler: WindowScheduler,
    ingest: IntentIngest,
    engine: Arc<ArbitrationEngine>,
    metrics: Arc<Metrics>,
}

impl ServiceFlow {
    pub fn new(
        config: &AppConfig,
        audit: Arc<dyn AuditLogger>,
        directory: Option<Arc<dyn PriorityDirectory>>,
        sink: Arc<dyn CommandSink>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ResolutionKey>), ArbiterError> {
        let store = IntentStore::new();
        let (scheduler, fired_rx) = WindowScheduler::new(config.arbitration.collection_window());
        let ingest = IntentIngest::new(store.clone(), scheduler.clone(), config.arbitration.default_ttl());
        let resolver = PriorityResolver::new(
            config.priority.typed_table(),
            directory,
            config.priority.lookup_timeout(),
            config.priority.default_priority,
        );
        let engine = Arc::new(ArbitrationEngine::new(store.clone(), resolver, audit, sink));
        let metrics = Arc::new(Metrics::new()?);
        Ok((Self { store, scheduler, ingest, engine, metrics }, fired_rx))
    }

    pub fn store(&self) -> IntentStore {
        self.store.clone()
    }

    pub fn scheduler(&self) -> WindowScheduler {
        self.scheduler.clone()
    }

    pub fn ingest(&self) -> IntentIngest {
        self.ingest.clone()
    }

    pub fn engine(&self) -> Arc<ArbitrationEngine> {
        self.engine.clone()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }
}
