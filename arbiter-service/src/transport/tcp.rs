//! Line-delimited JSON over TCP: the ingress listener producers push
//! intents at, and the egress client that delivers winning commands.

use arbiter_core::domain::{Command, IntentDraft};
use arbiter_core::foundation::constants::MAX_WIRE_LINE_BYTES;
use arbiter_core::infrastructure::transport::{CommandSink, IntentSource, IntentSubscription};
use arbiter_core::{ArbiterError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const INBOUND_CHANNEL_CAPACITY: usize = 256;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fire-and-forget ingress. Producers connect, write one JSON intent per
/// line, and never read back; parse failures are dropped here because
/// there is no reply path to report them on.
pub struct TcpIntentSource {
    local_addr: SocketAddr,
    receiver: Mutex<Option<mpsc::Receiver<IntentDraft>>>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl TcpIntentSource {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ArbiterError::transport("bind", format!("{}: {}", addr, err)))?;
        let local_addr = listener.local_addr().map_err(|err| ArbiterError::transport("bind", err.to_string()))?;
        info!("intent ingress listening addr={}", local_addr);
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let accept_task = tokio::spawn(run_accept_loop(listener, tx));
        Ok(Self { local_addr, receiver: Mutex::new(Some(rx)), accept_task })
    }

    /// Bound address, for callers that bind port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for TcpIntentSource {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

#[async_trait]
impl IntentSource for TcpIntentSource {
    async fn subscribe(&self) -> Result<IntentSubscription> {
        let receiver = self.receiver.lock().unwrap_or_else(|err| err.into_inner()).take();
        let Some(mut receiver) = receiver else {
            return Err(ArbiterError::transport("subscribe", "intent source already subscribed"));
        };
        let stream = async_stream::stream! {
            while let Some(draft) = receiver.recv().await {
                yield Ok(draft);
            }
        };
        Ok(IntentSubscription::new(stream.boxed()))
    }
}

async fn run_accept_loop(listener: TcpListener, tx: mpsc::Sender<IntentDraft>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("producer connected peer={}", peer);
                tokio::spawn(run_producer_connection(stream, peer, tx.clone()));
            }
            Err(err) => {
                warn!("accept failed error={}", err);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

async fn run_producer_connection(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<IntentDraft>) {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        // Cap each read at one line's worth of bytes; a producer that never
        // sends a newline would otherwise grow the buffer without bound.
        let read = match (&mut reader).take(MAX_WIRE_LINE_BYTES as u64 + 1).read_until(b'\n', &mut line).await {
            Ok(read) => read,
            Err(err) => {
                warn!("producer read failed peer={} error={}", peer, err);
                break;
            }
        };
        if read == 0 {
            debug!("producer disconnected peer={}", peer);
            break;
        }
        if line.len() > MAX_WIRE_LINE_BYTES {
            // Past the cap there is no way to find the next line boundary,
            // so the whole connection goes.
            warn!("oversized intent line, closing connection peer={} bytes={}", peer, line.len());
            break;
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let draft = match serde_json::from_str::<IntentDraft>(text) {
            Ok(draft) => draft,
            Err(err) => {
                warn!("dropping unparseable intent line peer={} error={}", peer, err);
                continue;
            }
        };
        if tx.send(draft).await.is_err() {
            break;
        }
    }
}

/// Egress client for winning commands, one JSON line each. The
/// connection is kept across calls; a failed write drops it and the next
/// forward reconnects.
pub struct TcpCommandSink {
    addr: String,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
}

impl TcpCommandSink {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), stream: tokio::sync::Mutex::new(None) }
    }
}

#[async_trait]
impl CommandSink for TcpCommandSink {
    async fn forward(&self, command: &Command) -> Result<()> {
        let mut wire = serde_json::to_string(command)?;
        wire.push('\n');

        let mut guard = self.stream.lock().await;
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => TcpStream::connect(&self.addr)
                .await
                .map_err(|err| ArbiterError::transport("forward", format!("connect {}: {}", self.addr, err)))?,
        };

        if let Err(err) = stream.write_all(wire.as_bytes()).await {
            return Err(ArbiterError::transport("forward", format!("send: {}", err)));
        }
        if let Err(err) = stream.flush().await {
            return Err(ArbiterError::transport("forward", format!("flush: {}", err)));
        }
        *guard = Some(stream);
        Ok(())
    }
}
