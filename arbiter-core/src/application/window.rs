use crate::foundation::ResolutionKey;
use log::trace;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-key collection windows.
///
/// The first intent for a key opens a window; every further intent for
/// that key during the window just joins the pending batch. When the
/// window elapses the key is handed to the receiver returned by `new`
/// for resolution. Windows are independent per key, so one key's window
/// never delays another's.
#[derive(Clone)]
pub struct WindowScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    window: Duration,
    open_keys: Mutex<HashSet<ResolutionKey>>,
    fired_tx: mpsc::UnboundedSender<ResolutionKey>,
}

impl WindowScheduler {
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<ResolutionKey>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let inner = SchedulerInner { window, open_keys: Mutex::new(HashSet::new()), fired_tx };
        (Self { inner: Arc::new(inner) }, fired_rx)
    }

    /// Record one arrival for `key`. Returns true when this arrival opened
    /// a new window (and started its timer).
    pub fn note_arrival(&self, key: ResolutionKey) -> bool {
        let newly_opened = self.inner.open_keys.lock().unwrap_or_else(|err| err.into_inner()).insert(key.clone());
        if newly_opened {
            trace!("collection window opened key={}", key);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(inner.window).await;
                // Close the window before handing the key over, so an
                // intent arriving after the deadline opens a fresh window
                // instead of joining a batch already being resolved.
                inner.open_keys.lock().unwrap_or_else(|err| err.into_inner()).remove(&key);
                // Send fails only when the service loop is gone; nothing
                // left to resolve for then.
                let _ = inner.fired_tx.send(key);
            });
        }
        newly_opened
    }

    pub fn open_windows(&self) -> usize {
        self.inner.open_keys.lock().unwrap_or_else(|err| err.into_inner()).len()
    }
}
