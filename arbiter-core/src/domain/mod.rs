pub mod arbitration;
pub mod audit;
pub mod intent;

pub use arbitration::BatchOutcome;
pub use audit::AuditEvent;
pub use intent::{Command, Intent, IntentDraft, IntentRecord};
