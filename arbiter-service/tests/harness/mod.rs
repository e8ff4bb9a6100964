pub mod wait;

pub use wait::*;
