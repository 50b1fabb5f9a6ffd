//! File-system change sources.
//!
//! [`WatchSource`] is the seam between the live engine and the platform
//! notification facility: [`NotifySource`] is backed by `notify`, while
//! [`ChannelWatchSource`] lets callers push events by hand.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Mutex, PoisonError};

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::error::WatchError;

/// Kind of change observed on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    /// A file appeared.
    Created,
    /// A file's content or metadata changed.
    Modified,
    /// A file was removed.
    Deleted,
}

/// A single file change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// What happened.
    pub kind: FileEventKind,
    /// Absolute path of the changed file.
    pub path: PathBuf,
}

impl FileEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Stream of events delivered for one subscription, in delivery order.
///
/// The stream disconnects once the subscription is dropped by its source.
pub type EventStream = Receiver<Result<FileEvent, WatchError>>;

/// Handle identifying one subscription on a [`WatchSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An active subscription: its handle and event stream.
#[derive(Debug)]
pub struct Subscription {
    /// Handle passed back to [`WatchSource::unsubscribe`].
    pub id: SubscriptionId,
    /// Events for the subscribed path.
    pub events: EventStream,
}

/// Capability to observe changes below a directory.
///
/// The same path may be subscribed more than once; every subscription gets
/// its own stream.
pub trait WatchSource: Send + Sync {
    /// Start delivering changes below `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Backend`] if the notification facility refuses
    /// the path.
    fn subscribe(&self, path: &Path, recursive: bool) -> Result<Subscription, WatchError>;

    /// Stop delivering changes for `id`. Unknown handles are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Backend`] if the facility fails to release the
    /// watch.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), WatchError>;
}

/// Translate a `notify` event into file events.
///
/// Folder events, renames and access events yield nothing.
#[must_use]
pub fn map_event(event: &notify::Event) -> Vec<FileEvent> {
    let kind = match event.kind {
        EventKind::Create(CreateKind::File | CreateKind::Any) => FileEventKind::Created,
        EventKind::Modify(
            ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Metadata(_) | ModifyKind::Other,
        ) => FileEventKind::Modified,
        EventKind::Remove(RemoveKind::File | RemoveKind::Any) => FileEventKind::Deleted,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| FileEvent::new(kind, path.clone()))
        .collect()
}

/// [`WatchSource`] backed by the platform's recommended `notify` watcher.
///
/// Each subscription owns its own watcher; dropping it on unsubscribe closes
/// the event stream.
#[derive(Default)]
pub struct NotifySource {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<SubscriptionId, (PathBuf, RecommendedWatcher)>>,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .watchers
            .lock()
            .map_or(0, |watchers| watchers.len());
        f.debug_struct("NotifySource")
            .field("subscriptions", &count)
            .finish()
    }
}

impl NotifySource {
    /// Create a source with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchSource for NotifySource {
    fn subscribe(&self, path: &Path, recursive: bool) -> Result<Subscription, WatchError> {
        let (tx, rx) = channel();
        let backend_path = path.to_path_buf();
        let handler = move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for file_event in map_event(&event) {
                    if tx.send(Ok(file_event)).is_err() {
                        return;
                    }
                }
            }
            Err(source) => {
                let _ = tx.send(Err(WatchError::Backend {
                    path: backend_path.clone(),
                    source,
                }));
            }
        };

        let backend = |source| WatchError::Backend {
            path: path.to_path_buf(),
            source,
        };
        let mut watcher = notify::recommended_watcher(handler).map_err(backend)?;
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(path, mode).map_err(backend)?;

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (path.to_path_buf(), watcher));
        Ok(Subscription { id, events: rx })
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), WatchError> {
        let removed = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        let Some((path, mut watcher)) = removed else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        watcher
            .unwatch(&path)
            .map_err(|source| WatchError::Backend { path, source })
    }
}

/// [`WatchSource`] whose events are pushed by the caller.
///
/// Events sent to a path reach every subscription whose directory contains
/// it. Closing the source disconnects every stream after the events already
/// queued have been delivered.
#[derive(Debug, Default)]
pub struct ChannelWatchSource {
    next_id: AtomicU64,
    senders: Mutex<HashMap<SubscriptionId, (PathBuf, Sender<Result<FileEvent, WatchError>>)>>,
    refused: Mutex<HashSet<PathBuf>>,
}

impl ChannelWatchSource {
    /// Create a source with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later subscription of `path` fail.
    pub fn refuse(&self, path: &Path) {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf());
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `event` to every subscription covering its path. Returns the
    /// number of streams it was delivered to.
    pub fn send(&self, event: &FileEvent) -> usize {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders
            .values()
            .filter(|(dir, _)| event.path.starts_with(dir))
            .filter(|(_, tx)| tx.send(Ok(event.clone())).is_ok())
            .count()
    }

    /// Deliver a backend error to every subscription of `path`.
    pub fn send_error(&self, path: &Path, message: &str) {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        for (dir, tx) in senders.values() {
            if dir == path {
                let _ = tx.send(Err(WatchError::Backend {
                    path: dir.clone(),
                    source: notify::Error::generic(message),
                }));
            }
        }
    }

    /// Drop every subscription, disconnecting their streams.
    pub fn close(&self) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl WatchSource for ChannelWatchSource {
    fn subscribe(&self, path: &Path, _recursive: bool) -> Result<Subscription, WatchError> {
        if self
            .refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
        {
            return Err(WatchError::Backend {
                path: path.to_path_buf(),
                source: notify::Error::path_not_found(),
            });
        }
        let (tx, rx) = channel();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (path.to_path_buf(), tx));
        Ok(Subscription { id, events: rx })
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), WatchError> {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        Ok(())
    }
}
