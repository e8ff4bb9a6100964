//! Application layer: orchestration across domain logic and infrastructure I/O.

pub mod engine;
pub mod ingest;
pub mod resolver;
pub mod window;

pub use engine::{ArbitrationEngine, Resolution};
pub use ingest::IntentIngest;
pub use resolver::PriorityResolver;
pub use window::WindowScheduler;
