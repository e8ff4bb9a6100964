pub mod r#loop;
pub mod sweep;

pub use r#loop::run_arbitration_loop;
pub use sweep::run_sweep_loop;
