//! Progress fan-out to connected UI sessions.
//!
//! The broadcaster is an explicit registry owned by the server process:
//! subscribers are added on connect and removed on disconnect, and a
//! broadcast is delivered to whoever is connected at that moment. There is
//! no queuing, replay, or backpressure; a subscriber whose channel has
//! closed is silently dropped from the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// One progress frame as pushed to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        ProgressEvent {
            kind: "progress",
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Process-wide registry of progress subscribers.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<ProgressEvent>>>,
    next_id: AtomicU64,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. The returned id is handed back to
    /// [`unsubscribe`](Self::unsubscribe) on disconnect.
    pub fn subscribe(&self) -> (u64, mpsc::UnboundedReceiver<ProgressEvent>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .insert(id, tx);
        debug!("progress subscriber {} registered", id);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .remove(&id);
        debug!("progress subscriber {} removed", id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .len()
    }

    /// Send an event to every currently connected subscriber. Subscribers
    /// whose receiving end has gone away are pruned, not errors.
    pub fn broadcast(&self, message: impl Into<String>, data: Value) {
        let event = ProgressEvent::new(message, data);
        debug!("progress: {}", event.message);
        self.inner
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}
