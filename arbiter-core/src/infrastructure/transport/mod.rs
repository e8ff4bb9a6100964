//! Transport seams: the engine consumes an intent stream and pushes
//! commands through a sink, never touching sockets directly. Real TCP
//! implementations live in the service crate; the mock hub here backs
//! tests.

pub mod mock;

use crate::domain::{Command, IntentDraft};
use crate::foundation::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

/// Stream of inbound intent drafts from the ingress transport.
pub struct IntentSubscription {
    inner: BoxStream<'static, Result<IntentDraft>>,
}

impl IntentSubscription {
    pub fn new(inner: BoxStream<'static, Result<IntentDraft>>) -> Self {
        Self { inner }
    }

    /// Next inbound draft; `None` when the transport shut down.
    pub async fn next(&mut self) -> Option<Result<IntentDraft>> {
        self.inner.next().await
    }
}

/// Many-to-one ingress: producers push intents at the arbiter.
#[async_trait]
pub trait IntentSource: Send + Sync {
    async fn subscribe(&self) -> Result<IntentSubscription>;
}

/// Push egress for winning commands. Best-effort: one delivery attempt
/// per call, the caller decides what a failure means.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn forward(&self, command: &Command) -> Result<()>;
}
