pub mod tcp;

pub use tcp::{TcpCommandSink, TcpIntentSource};
