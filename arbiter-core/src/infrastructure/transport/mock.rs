use super::{CommandSink, IntentSource, IntentSubscription};
use crate::domain::{Command, IntentDraft};
use crate::foundation::{ArbiterError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// In-process hub for tests: producers publish drafts, every subscribed
/// source sees them.
pub struct MockHub {
    intents: broadcast::Sender<IntentDraft>,
}

impl MockHub {
    pub fn new() -> Self {
        Self { intents: broadcast::channel(256).0 }
    }

    /// `broadcast::Sender::send` fails when no receiver is subscribed.
    /// A producer publishing before the arbiter is up is not an error
    /// on a real wire, so treat it as success here too.
    pub fn publish(&self, draft: IntentDraft) {
        let _ = self.intents.send(draft);
    }

    /// Live subscription count, so tests can wait for the arbiter to
    /// attach before publishing.
    pub fn subscriber_count(&self) -> usize {
        self.intents.receiver_count()
    }
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MockIntentSource {
    hub: Arc<MockHub>,
}

impl MockIntentSource {
    pub fn new(hub: Arc<MockHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl IntentSource for MockIntentSource {
    async fn subscribe(&self) -> Result<IntentSubscription> {
        let mut receiver = self.hub.intents.subscribe();
        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(draft) => yield Ok(draft),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        yield Err(ArbiterError::Message("mock intent source lagged".to_string()));
                    }
                }
            }
        };
        Ok(IntentSubscription::new(Box::pin(stream)))
    }
}

/// Records every forwarded command; can be flipped into a failing mode
/// to exercise the best-effort delivery path.
#[derive(Clone, Default)]
pub struct MockCommandSink {
    commands: Arc<Mutex<Vec<Command>>>,
    failing: Arc<AtomicBool>,
}

impl MockCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap_or_else(|err| err.into_inner()).clone()
    }
}

#[async_trait]
impl CommandSink for MockCommandSink {
    async fn forward(&self, command: &Command) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(ArbiterError::transport("forward", "mock sink is failing"));
        }
        self.commands.lock().unwrap_or_else(|err| err.into_inner()).push(command.clone());
        Ok(())
    }
}
