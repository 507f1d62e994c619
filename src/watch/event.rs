//! Translation of raw notify events into mirror events
//!
//! notify reports what the OS saw; the mirror only cares about five things
//! happening below a source root. Whenever the raw kind does not say whether
//! the path is a file or a directory, the path is probed on disk.

use crate::mirror::MappingId;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to a path below a watched source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorEventKind {
    FileAdded,
    FileChanged,
    FileRemoved,
    DirectoryAdded,
    DirectoryRemoved,
}

impl fmt::Display for MirrorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MirrorEventKind::FileAdded => "file added",
            MirrorEventKind::FileChanged => "file changed",
            MirrorEventKind::FileRemoved => "file removed",
            MirrorEventKind::DirectoryAdded => "directory added",
            MirrorEventKind::DirectoryRemoved => "directory removed",
        };
        f.write_str(label)
    }
}

/// A classified event for one absolute source path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEvent {
    pub kind: MirrorEventKind,
    pub path: PathBuf,
}

impl MirrorEvent {
    pub fn new(kind: MirrorEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// What a path currently is on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Probe the filesystem without following symlinks (a link counts as a file)
pub fn probe_disk(path: &Path) -> Option<EntryType> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    if meta.is_dir() {
        Some(EntryType::Directory)
    } else {
        Some(EntryType::File)
    }
}

/// Classify a raw notify event
///
/// `probe` reports what a path is right now, or `None` if it is gone.
/// Renames become a removal of the old path and an addition of the new one.
/// Access events and modifications of directories are dropped.
pub fn classify(event: &Event, probe: impl Fn(&Path) -> Option<EntryType>) -> Vec<MirrorEvent> {
    let added = |path: &Path| -> Option<MirrorEvent> {
        match probe(path)? {
            EntryType::File => Some(MirrorEvent::new(MirrorEventKind::FileAdded, path)),
            EntryType::Directory => Some(MirrorEvent::new(MirrorEventKind::DirectoryAdded, path)),
        }
    };
    let removed = |path: &Path| MirrorEvent::new(MirrorEventKind::FileRemoved, path);

    match event.kind {
        EventKind::Create(CreateKind::File) => event
            .paths
            .iter()
            .map(|p| MirrorEvent::new(MirrorEventKind::FileAdded, p))
            .collect(),
        EventKind::Create(CreateKind::Folder) => event
            .paths
            .iter()
            .map(|p| MirrorEvent::new(MirrorEventKind::DirectoryAdded, p))
            .collect(),
        EventKind::Create(_) => event.paths.iter().filter_map(|p| added(p.as_path())).collect(),

        EventKind::Remove(RemoveKind::Folder) => event
            .paths
            .iter()
            .map(|p| MirrorEvent::new(MirrorEventKind::DirectoryRemoved, p))
            .collect(),
        EventKind::Remove(_) => event.paths.iter().map(|p| removed(p.as_path())).collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().map(|p| removed(p.as_path())).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().filter_map(|p| added(p.as_path())).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            let mut events = vec![removed(event.paths[0].as_path())];
            events.extend(added(event.paths[1].as_path()));
            events
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| added(p.as_path()).unwrap_or_else(|| removed(p.as_path())))
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| probe(p.as_path()) == Some(EntryType::File))
            .map(|p| MirrorEvent::new(MirrorEventKind::FileChanged, p))
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Events published while watching
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A mirror event was applied to the destination
    Applied {
        mapping: MappingId,
        kind: MirrorEventKind,
        path: PathBuf,
        target: PathBuf,
        /// Set when the filesystem action failed
        error: Option<String>,
    },

    /// The underlying watcher reported an error; it is not restarted
    WatcherError {
        mapping: MappingId,
        source: PathBuf,
        message: String,
    },
}

impl SyncEvent {
    pub fn mapping(&self) -> MappingId {
        match self {
            SyncEvent::Applied { mapping, .. } | SyncEvent::WatcherError { mapping, .. } => *mapping,
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            SyncEvent::Applied { error, .. } => error.is_some(),
            SyncEvent::WatcherError { .. } => true,
        }
    }
}
