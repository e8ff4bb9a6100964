use super::{PriorityDirectory, PriorityReply, PriorityRequest};
use crate::foundation::{AppId, ArbiterError, Result};
use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Line-delimited JSON request/reply client: one connection per lookup.
///
/// The resolver bounds every call with its own timeout, so this client
/// carries no internal deadline and no retries.
pub struct TcpDirectory {
    addr: String,
}

impl TcpDirectory {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl PriorityDirectory for TcpDirectory {
    async fn app_priority(&self, app_id: &AppId) -> Result<Option<i64>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|err| ArbiterError::directory(app_id.as_str(), format!("connect {}: {}", self.addr, err)))?;
        let (read_half, mut write_half) = stream.into_split();

        let mut request = serde_json::to_string(&PriorityRequest::new(app_id.clone()))?;
        request.push('\n');
        write_half
            .write_all(request.as_bytes())
            .await
            .map_err(|err| ArbiterError::directory(app_id.as_str(), format!("send: {}", err)))?;

        let mut reply = String::new();
        let mut reader = BufReader::new(read_half);
        let read = reader
            .read_line(&mut reply)
            .await
            .map_err(|err| ArbiterError::directory(app_id.as_str(), format!("recv: {}", err)))?;
        if read == 0 {
            return Err(ArbiterError::directory(app_id.as_str(), "connection closed before reply"));
        }

        match serde_json::from_str::<PriorityReply>(reply.trim()) {
            Ok(reply) => Ok(Some(reply.priority)),
            Err(_) => {
                // Error replies ({"status":"ERROR",..}) and unknown shapes
                // both mean the directory has no answer.
                debug!("directory reply has no priority app_id={} reply={}", app_id, reply.trim());
                Ok(None)
            }
        }
    }
}
