//! Applying mirror events to a destination tree
//!
//! Every handler computes the destination counterpart of the event path and
//! performs one filesystem action. Failures are logged and reported in the
//! returned [`SyncEvent`], never propagated.

use super::event::{MirrorEvent, MirrorEventKind, SyncEvent};
use crate::fs_ops;
use crate::logging::MirrorLog;
use crate::mirror::Mapping;
use crate::Result;
use std::path::{Path, PathBuf};

/// Apply one event, returning the published outcome(s)
///
/// A directory addition also mirrors whatever already sits inside the new
/// directory, since its contents may have been written before the OS watch
/// on it was in place.
pub async fn apply(mapping: &Mapping, event: &MirrorEvent, log: &dyn MirrorLog) -> Vec<SyncEvent> {
    // Our own writes, when the destination lives under the source
    if event.path.starts_with(&mapping.destination) {
        tracing::debug!(path = %event.path.display(), "Ignoring event inside destination");
        return Vec::new();
    }

    let Some(target) = mapping.target_for(&event.path) else {
        tracing::debug!(path = %event.path.display(), "Ignoring event outside of source");
        return Vec::new();
    };

    let mut published = vec![apply_one(mapping, event, &target, log).await];

    if event.kind == MirrorEventKind::DirectoryAdded && !published[0].is_error() {
        let root = event.path.clone();
        let listed = tokio::task::spawn_blocking(move || fs_ops::list_tree(&root)).await;
        match listed.map_err(crate::MirrorError::from).and_then(|r| r) {
            Ok(entries) => {
                for (path, is_dir) in entries {
                    let kind = if is_dir {
                        MirrorEventKind::DirectoryAdded
                    } else {
                        MirrorEventKind::FileAdded
                    };
                    if path.starts_with(&mapping.destination) {
                        continue;
                    }
                    let nested = MirrorEvent::new(kind, path);
                    if let Some(target) = mapping.target_for(&nested.path) {
                        published.push(apply_one(mapping, &nested, &target, log).await);
                    }
                }
            }
            Err(err) => log.error(
                &format!("Error scanning directory {}", event.path.display()),
                &err,
            ),
        }
    }

    published
}

async fn apply_one(
    mapping: &Mapping,
    event: &MirrorEvent,
    target: &Path,
    log: &dyn MirrorLog,
) -> SyncEvent {
    let path = event.path.display();
    let shown = target.display();

    let (result, done, failed): (Result<()>, String, String) = match event.kind {
        MirrorEventKind::FileAdded | MirrorEventKind::FileChanged => {
            log.info(&format!("File {}: {}", verb(event.kind), path));
            (
                fs_ops::copy_file(&event.path, target).await,
                format!("Copied {} to {}", path, shown),
                format!("Error copying file from {} to {}", path, shown),
            )
        }
        MirrorEventKind::DirectoryAdded => {
            log.info(&format!("Directory added: {}", path));
            (
                fs_ops::ensure_dir(target).await,
                format!("Created directory {}", shown),
                format!("Error creating directory {}", shown),
            )
        }
        MirrorEventKind::FileRemoved => {
            log.info(&format!("File removed: {}", path));
            (
                fs_ops::remove_path(target).await.map(|_| ()),
                format!("Removed {}", shown),
                format!("Error removing file from {}", shown),
            )
        }
        MirrorEventKind::DirectoryRemoved => {
            log.info(&format!("Directory removed: {}", path));
            (
                fs_ops::remove_path(target).await.map(|_| ()),
                format!("Removed directory {}", shown),
                format!("Error removing directory {}", shown),
            )
        }
    };

    let error = match result {
        Ok(()) => {
            log.info(&done);
            None
        }
        Err(err) => {
            log.error(&failed, &err);
            Some(err.to_string())
        }
    };

    SyncEvent::Applied {
        mapping: mapping.id,
        kind: event.kind,
        path: event.path.clone(),
        target: PathBuf::from(target),
        error,
    }
}

fn verb(kind: MirrorEventKind) -> &'static str {
    match kind {
        MirrorEventKind::FileChanged => "changed",
        _ => "added",
    }
}
