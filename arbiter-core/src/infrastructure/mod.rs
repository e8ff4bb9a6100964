pub mod audit;
pub mod config;
pub mod directory;
pub mod logging;
pub mod store;
pub mod transport;
