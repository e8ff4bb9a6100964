use crate::infrastructure::config::types::AppConfig;

const MAX_COLLECTION_WINDOW_MS: u64 = 60_000;

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.arbitration.collection_window_ms == 0 {
            errors.push("arbitration.collection_window_ms must be > 0".to_string());
        }
        if self.arbitration.collection_window_ms > MAX_COLLECTION_WINDOW_MS {
            errors.push(format!("arbitration.collection_window_ms should not exceed {}", MAX_COLLECTION_WINDOW_MS));
        }
        if !self.arbitration.default_ttl_seconds.is_finite() || self.arbitration.default_ttl_seconds <= 0.0 {
            errors.push("arbitration.default_ttl_seconds must be a positive number".to_string());
        }
        if self.arbitration.sweep_interval_seconds == 0 {
            errors.push("arbitration.sweep_interval_seconds must be > 0".to_string());
        }

        if self.priority.lookup_timeout_ms == 0 {
            errors.push("priority.lookup_timeout_ms must be > 0".to_string());
        }
        for app_id in self.priority.table.keys() {
            if app_id.trim().is_empty() {
                errors.push("priority.table keys must not be empty".to_string());
            }
        }
        if let Some(addr) = self.priority.directory_addr() {
            check_host_port(addr, "priority.directory_addr", &mut errors);
        }

        check_host_port(&self.ingress.listen_addr, "ingress.listen_addr", &mut errors);
        check_host_port(&self.egress.forward_addr, "egress.forward_addr", &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Hostnames are allowed (the connectors resolve them), so only the
/// `host:port` shape is checked here.
fn check_host_port(addr: &str, field: &str, errors: &mut Vec<String>) {
    let valid = addr.trim().rsplit_once(':').map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok()).unwrap_or(false);
    if !valid {
        errors.push(format!("{field} must be host:port, got '{addr}'"));
    }
}
