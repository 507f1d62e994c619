//! Folder mirroring
//!
//! [`Mirror`] ties the pieces together: a [`MappingRegistry`] of folder pairs,
//! the bulk operators (`copy`, `clean`) and a [`WatchController`] for
//! continuous mirroring.
//!
//! ```no_run
//! # async fn demo() -> dirmirror::Result<()> {
//! use dirmirror::mirror::{MappingOptions, Mirror};
//!
//! let mut mirror = Mirror::new();
//! mirror.add("src/imgs", "dist/imgs", MappingOptions::default())?;
//! mirror.add("src/logos", "dist/logos", MappingOptions::default())?;
//!
//! let report = mirror.copy().await;
//! println!("{}", report.message());
//!
//! mirror.watch()?;
//! // ...
//! mirror.stop();
//! # Ok(())
//! # }
//! ```

pub mod bulk;
mod mapping;
mod registry;
mod report;

pub use mapping::{absolute_path, normalize_path, Mapping, MappingId, MappingOptions, MirrorOptions, PathFilter};
pub use registry::MappingRegistry;
pub use report::{BulkOperation, MappingOutcome, SyncReport};

use crate::logging::{MirrorLog, TracingLog};
use crate::watch::{SyncEvent, WatchController};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Mapping registry plus the operations that act on it
#[derive(Debug)]
pub struct Mirror {
    registry: MappingRegistry,
    watcher: WatchController,
    log: Arc<dyn MirrorLog>,
}

impl Mirror {
    /// Mirror resolving relative paths against the working directory, logging via tracing
    pub fn new() -> Self {
        Self::from_registry(MappingRegistry::new(), Arc::new(TracingLog))
    }

    /// Mirror resolving relative paths against `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self::from_registry(MappingRegistry::with_base_dir(base_dir), Arc::new(TracingLog))
    }

    /// Replace the log sink
    ///
    /// Must be called before `watch()`; running watchers keep the sink they
    /// were started with.
    pub fn with_log(mut self, log: Arc<dyn MirrorLog>) -> Self {
        self.watcher = WatchController::new(Arc::clone(&log));
        self.log = log;
        self
    }

    fn from_registry(registry: MappingRegistry, log: Arc<dyn MirrorLog>) -> Self {
        Self {
            registry,
            watcher: WatchController::new(Arc::clone(&log)),
            log,
        }
    }

    /// Register a folder pair; see [`MappingRegistry::add`]
    ///
    /// A mapping added while watching is not watched until `watch()` is
    /// called again.
    pub fn add(
        &mut self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        options: MappingOptions,
    ) -> Result<MappingId> {
        self.registry.add(source, destination, options)
    }

    /// Unregister a mapping, closing its watcher first
    pub fn remove(&mut self, id: MappingId) -> Result<Mapping> {
        self.watcher.stop_mapping(id);
        self.registry.remove(id)
    }

    pub fn mappings(&self) -> &[Mapping] {
        self.registry.mappings()
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Copy every source into its destination, all mappings concurrently
    ///
    /// Never fails as a whole; inspect the report for per-mapping errors.
    pub async fn copy(&self) -> SyncReport {
        bulk::copy_all(self.registry.mappings().to_vec(), Arc::clone(&self.log)).await
    }

    /// Empty every destination, all mappings concurrently
    pub async fn clean(&self) -> SyncReport {
        bulk::clean_all(self.registry.mappings().to_vec(), Arc::clone(&self.log)).await
    }

    /// Start watching every registered mapping; returns immediately
    ///
    /// Must be called from within a Tokio runtime. Returns the number of
    /// watchers started by this call.
    pub fn watch(&mut self) -> Result<usize> {
        self.watcher.watch(self.registry.mappings())
    }

    /// Close every watcher; a no-op when nothing is watched
    pub fn stop(&mut self) {
        self.watcher.stop();
    }

    /// Subscribe to the outcome of every action taken while watching
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.watcher.subscribe()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.active_count() > 0
    }

    pub fn active_watchers(&self) -> usize {
        self.watcher.active_count()
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}
