pub mod application;
pub mod domain;
pub mod foundation;
pub mod infrastructure;

pub use foundation::{ArbiterError, Result};
