//! Watch mode
//!
//! Keeps destinations in sync with their sources while running:
//! - **event**: classification of raw notify events, published [`SyncEvent`]s
//! - **handler**: the filesystem action taken for each event
//! - **controller**: watcher lifecycle (start, stop, per-mapping tasks)

pub mod controller;
pub mod event;
pub mod handler;

pub use controller::{WatchController, DEFAULT_EVENT_CHANNEL_CAPACITY};
pub use event::{classify, EntryType, MirrorEvent, MirrorEventKind, SyncEvent};
