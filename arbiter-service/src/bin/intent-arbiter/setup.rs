use arbiter_core::infrastructure::audit::{AuditLogger, FileAuditLogger, MultiAuditLogger, StructuredAuditLogger};
use arbiter_core::infrastructure::config::AppConfig;
use arbiter_core::infrastructure::directory::{PriorityDirectory, TcpDirectory};
use arbiter_core::ArbiterError;
use log::{info, warn};
use std::sync::Arc;

pub fn init_logging(log_dir: Option<&str>, filters: &str) {
    arbiter_core::infrastructure::logging::init_logger(log_dir, filters);
}

pub fn load_app_config() -> Result<Arc<AppConfig>, ArbiterError> {
    let app_config = Arc::new(arbiter_core::infrastructure::config::load_app_config()?);
    warn_validation_errors(&app_config);
    Ok(app_config)
}

pub fn load_app_config_profile(path: &std::path::Path, profile: &str) -> Result<Arc<AppConfig>, ArbiterError> {
    let app_config = Arc::new(arbiter_core::infrastructure::config::load_app_config_from_profile_path(path, profile)?);
    warn_validation_errors(&app_config);
    Ok(app_config)
}

fn warn_validation_errors(app_config: &AppConfig) {
    if let Err(errors) = app_config.validate() {
        for err in errors {
            warn!("config validation error: {}", err);
        }
    }
}

/// Audit sinks from config: the JSONL trail always, the structured-log
/// mirror when enabled.
pub fn init_audit(app_config: &AppConfig) -> Result<Arc<dyn AuditLogger>, ArbiterError> {
    let path = app_config.audit_log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| ArbiterError::Message(format!("create audit dir: {}", err)))?;
    }
    let file = FileAuditLogger::new(&path).map_err(|err| ArbiterError::Message(format!("open audit log: {}", err)))?;
    info!("audit trail opened path={}", path.display());

    let mut multi = MultiAuditLogger::new();
    multi.add_logger(Box::new(file));
    if app_config.audit.structured {
        multi.add_logger(Box::new(StructuredAuditLogger));
    }
    Ok(Arc::new(multi))
}

pub fn init_directory(app_config: &AppConfig) -> Option<Arc<dyn PriorityDirectory>> {
    let addr = app_config.priority.directory_addr()?;
    info!("priority directory configured addr={}", addr);
    Some(Arc::new(TcpDirectory::new(addr)))
}
