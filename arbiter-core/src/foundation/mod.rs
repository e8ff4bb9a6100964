pub mod constants;
mod error;
pub mod types;
pub mod util;

pub use error::{ArbiterError, ErrorCode, Result};
pub use types::{AppId, IntentId, NodeId, ParamName, ResolutionKey};
