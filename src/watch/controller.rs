//! Watch controller
//!
//! Owns one notify watcher per watched mapping. The notify callback only
//! forwards raw events into a channel; a Tokio task per mapping drains that
//! channel and applies events in arrival order, after first mirroring
//! everything already present in the source.
//!
//! ```text
//! notify thread ──raw event──▶ mpsc ──▶ mapping task ──▶ fs action
//!                                             │
//!                                             └──▶ broadcast (SyncEvent)
//! ```

use super::event::{classify, probe_disk, MirrorEvent, MirrorEventKind, SyncEvent};
use super::handler;
use crate::fs_ops;
use crate::logging::MirrorLog;
use crate::mirror::{Mapping, MappingId};
use crate::{MirrorError, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Default capacity of the [`SyncEvent`] broadcast channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A running watcher for one mapping
struct WatchHandle {
    mapping: MappingId,
    source: PathBuf,
    /// Dropping the watcher closes it
    watcher: RecommendedWatcher,
    /// Set on stop; the task then drops events it has not started on
    closed: Arc<AtomicBool>,
    /// Not aborted on stop so an action already underway can finish
    task: JoinHandle<()>,
}

/// Starts and stops watchers and publishes what they do
pub struct WatchController {
    handles: Vec<WatchHandle>,
    events: broadcast::Sender<SyncEvent>,
    log: Arc<dyn MirrorLog>,
}

impl WatchController {
    pub fn new(log: Arc<dyn MirrorLog>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        Self {
            handles: Vec::new(),
            events,
            log,
        }
    }

    /// Receive a [`SyncEvent`] for every action taken from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Start watching every mapping that is not watched yet
    ///
    /// Returns right away; mirroring happens on the current Tokio runtime.
    /// A mapping whose watcher cannot be started is logged and skipped.
    /// Returns how many watchers were started.
    pub fn watch(&mut self, mappings: &[Mapping]) -> Result<usize> {
        let runtime = Handle::try_current().map_err(|_| MirrorError::NoRuntime)?;
        let mut started = 0;

        for mapping in mappings {
            if self.is_watching(mapping.id) {
                self.log.warn(&format!(
                    "Already watching directory: {}",
                    mapping.source.display()
                ));
                continue;
            }

            match self.start(mapping, &runtime) {
                Ok(handle) => {
                    self.log.info(&format!(
                        "Started watching directory: {}",
                        mapping.source.display()
                    ));
                    self.handles.push(handle);
                    started += 1;
                }
                Err(err) => self.log.error(
                    &format!("Failed to watch directory {}", mapping.source.display()),
                    &err,
                ),
            }
        }

        Ok(started)
    }

    fn start(&self, mapping: &Mapping, runtime: &Handle) -> Result<WatchHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                // Receiver only goes away once the mapping task has ended
                let _ = tx.send(res);
            },
            Config::default().with_follow_symlinks(false),
        )?;
        watcher.watch(&mapping.source, RecursiveMode::Recursive)?;

        let task = runtime.spawn(run_mapping(
            mapping.clone(),
            watched_root(&mapping.source),
            rx,
            Arc::clone(&closed),
            self.events.clone(),
            Arc::clone(&self.log),
        ));

        Ok(WatchHandle {
            mapping: mapping.id,
            source: mapping.source.clone(),
            watcher,
            closed,
            task,
        })
    }

    /// Close every watcher
    ///
    /// An action already underway may still complete afterwards; events not
    /// yet acted on are dropped. Calling this with nothing being watched
    /// does nothing.
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            close(handle, self.log.as_ref());
        }
    }

    /// Close the watcher of a single mapping, if it has one
    pub fn stop_mapping(&mut self, id: MappingId) -> bool {
        match self.handles.iter().position(|h| h.mapping == id) {
            Some(index) => {
                let handle = self.handles.remove(index);
                close(handle, self.log.as_ref());
                true
            }
            None => false,
        }
    }

    pub fn is_watching(&self, id: MappingId) -> bool {
        self.handles.iter().any(|h| h.mapping == id)
    }

    pub fn active_count(&self) -> usize {
        self.handles.len()
    }
}

impl fmt::Debug for WatchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchController")
            .field(
                "watching",
                &self.handles.iter().map(|h| &h.source).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Drop for WatchController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn close(handle: WatchHandle, log: &dyn MirrorLog) {
    let WatchHandle {
        source,
        watcher,
        closed,
        task,
        ..
    } = handle;
    closed.store(true, Ordering::SeqCst);
    drop(watcher);
    drop(task);
    log.info(&format!("Stopped watching directory: {}", source.display()));
}

/// Canonical form of `source`, for backends that report resolved paths
///
/// FSEvents reports `/private/var/...` for a watch on `/var/...`.
fn watched_root(source: &Path) -> PathBuf {
    std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf())
}

/// Rewrite a path reported under `root` so it sits under `source` instead
fn rebase(path: PathBuf, root: &Path, source: &Path) -> PathBuf {
    if path.starts_with(source) {
        return path;
    }
    match path.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => source.to_path_buf(),
        Ok(relative) => source.join(relative),
        Err(_) => path,
    }
}

/// Mirror the current contents of the source, then follow its events
async fn run_mapping(
    mapping: Mapping,
    root: PathBuf,
    mut rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    closed: Arc<AtomicBool>,
    events: broadcast::Sender<SyncEvent>,
    log: Arc<dyn MirrorLog>,
) {
    initial_scan(&mapping, &closed, &events, log.as_ref()).await;

    while let Some(res) = rx.recv().await {
        if closed.load(Ordering::SeqCst) {
            break;
        }
        match res {
            Ok(raw) => {
                tracing::trace!(?raw, "Raw watch event");
                for mut event in classify(&raw, probe_disk) {
                    if closed.load(Ordering::SeqCst) {
                        break;
                    }
                    event.path = rebase(event.path, &root, &mapping.source);
                    publish(&events, handler::apply(&mapping, &event, log.as_ref()).await);
                }
            }
            Err(err) => {
                let message = format!("Watcher error in {}", mapping.source.display());
                log.error(&message, &err);
                let _ = events.send(SyncEvent::WatcherError {
                    mapping: mapping.id,
                    source: mapping.source.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    tracing::debug!(id = %mapping.id, "Watch task finished");
}

/// Report pre-existing entries as additions
async fn initial_scan(
    mapping: &Mapping,
    closed: &AtomicBool,
    events: &broadcast::Sender<SyncEvent>,
    log: &dyn MirrorLog,
) {
    let root = mapping.source.clone();
    let listed = tokio::task::spawn_blocking(move || fs_ops::list_tree(&root))
        .await
        .map_err(MirrorError::from)
        .and_then(|r| r);

    let entries = match listed {
        Ok(entries) => entries,
        Err(err) => {
            log.error(
                &format!("Error scanning directory {}", mapping.source.display()),
                &err,
            );
            return;
        }
    };

    for (path, is_dir) in entries {
        if closed.load(Ordering::SeqCst) {
            return;
        }
        let kind = if is_dir {
            MirrorEventKind::DirectoryAdded
        } else {
            MirrorEventKind::FileAdded
        };
        // Subdirectories are already part of this listing
        let event = MirrorEvent::new(kind, path);
        let target = match mapping.target_for(&event.path) {
            Some(target) => target,
            None => continue,
        };
        let outcome = if is_dir {
            let error = match fs_ops::ensure_dir(&target).await {
                Ok(()) => None,
                Err(err) => {
                    log.error(&format!("Error creating directory {}", target.display()), &err);
                    Some(err.to_string())
                }
            };
            SyncEvent::Applied {
                mapping: mapping.id,
                kind,
                path: event.path,
                target,
                error,
            }
        } else {
            let mut applied = handler::apply(mapping, &event, log).await;
            match applied.pop() {
                Some(outcome) => outcome,
                None => continue,
            }
        };
        let _ = events.send(outcome);
    }
}

fn publish(events: &broadcast::Sender<SyncEvent>, outcomes: Vec<SyncEvent>) {
    for outcome in outcomes {
        // No subscribers is fine
        let _ = events.send(outcome);
    }
}
