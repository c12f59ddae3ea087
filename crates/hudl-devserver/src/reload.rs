//! Live-reload fan-out.
//!
//! A bounded broadcast channel carries reload notifications to every SSE
//! subscriber. Slow subscribers fall behind the channel capacity and are
//! dropped by their stream; nothing here blocks the watcher.

use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// A reload-stream payload, serialized as the SSE `data:` line.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    Reload { component: String },
    Error { error: String, file: String },
}

#[derive(Debug)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Announce a successful reparse of `component`.
    pub fn notify_reload(&self, component: &str) {
        let _ = self.tx.send(ReloadEvent::Reload {
            component: component.to_string(),
        });
    }

    /// Announce a failed reparse; the stale entry stays servable, and the
    /// failure goes out-of-band to anyone listening.
    pub fn notify_error(&self, error: &str, file: &str) {
        let _ = self.tx.send(ReloadEvent::Error {
            error: error.to_string(),
            file: file.to_string(),
        });
    }
}
