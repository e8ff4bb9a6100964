pub mod arbitration;
pub mod flow;
pub mod metrics;
