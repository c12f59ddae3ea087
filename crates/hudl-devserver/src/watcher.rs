//! Filesystem watcher with burst coalescing.
//!
//! Wraps a `notify` recommended watcher behind a tokio channel. Editors
//! tend to fire several events per save; [`FileWatcher::next_batch`]
//! debounces a short quiet window and hands back the deduplicated set of
//! affected paths.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// What happened to a watched path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum WatchEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Changed(p) | WatchEvent::Removed(p) => p,
        }
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<WatchEvent>,
}

impl FileWatcher {
    /// Watch `root` recursively for `.hudl` changes.
    pub fn new(root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let Ok(event) = res else { return };
            let wrap: fn(PathBuf) -> WatchEvent = match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => WatchEvent::Changed,
                EventKind::Remove(_) => WatchEvent::Removed,
                _ => return,
            };
            for path in event.paths {
                if path.extension().and_then(|e| e.to_str()) == Some("hudl") {
                    let _ = tx.send(wrap(path));
                }
            }
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Wait for the next burst of events: blocks until one arrives, then
    /// keeps draining until `debounce` passes without another. Returns
    /// `None` when the watcher channel closes.
    pub async fn next_batch(&mut self, debounce: Duration) -> Option<Vec<WatchEvent>> {
        let first = self.receiver.recv().await?;
        let mut batch = BTreeSet::new();
        batch.insert(first);

        loop {
            match tokio::time::timeout(debounce, self.receiver.recv()).await {
                Ok(Some(event)) => {
                    batch.insert(event);
                }
                Ok(None) | Err(_) => break,
            }
        }

        Some(batch.into_iter().collect())
    }
}
