//! Filesystem primitives used by the bulk operators and the watcher
//!
//! Tree-wide operations (`copy_tree`, `empty_dir`) are blocking and meant to
//! run under `spawn_blocking`. Single-entry operations used by event handling
//! are async on `tokio::fs`.

use crate::mirror::MirrorOptions;
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counters collected while copying or cleaning a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub files_copied: usize,
    pub directories_created: usize,
    /// Entries rejected by the filter or left alone because they already existed
    pub skipped: usize,
    pub removed: usize,
}

/// Recursively copy `src` into `dest`
///
/// The filter sees every entry (the root included); a rejected directory is
/// not descended into. Symlinks are copied as links, never followed. Stops at
/// the first error.
pub fn copy_tree(src: &Path, dest: &Path, options: &MirrorOptions) -> Result<TreeStats> {
    let mut stats = TreeStats::default();
    let root_meta = fs::symlink_metadata(src)?;

    if root_meta.is_dir() && (dest == src || dest.starts_with(src)) {
        return Err(MirrorError::SelfCopy {
            src: src.to_path_buf(),
            dest: dest.to_path_buf(),
        });
    }

    let filtered = Cell::new(0usize);
    let walker = WalkDir::new(src)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let keep = options.filter.accepts(entry.path());
            if !keep {
                filtered.set(filtered.get() + 1);
            }
            keep
        });

    for entry in walker {
        let entry = entry?;
        let target = match entry.path().strip_prefix(src) {
            Ok(rel) if rel.as_os_str().is_empty() => dest.to_path_buf(),
            Ok(rel) => dest.join(rel),
            Err(_) => continue,
        };
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if !target.is_dir() {
                fs::create_dir_all(&target)?;
                stats.directories_created += 1;
            }
            continue;
        }

        if !prepare_target(&target, options)? {
            stats.skipped += 1;
            continue;
        }

        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
        stats.files_copied += 1;
    }

    stats.skipped += filtered.get();
    Ok(stats)
}

/// Decide whether a non-directory entry may be written to `target`
///
/// Returns `Ok(false)` to skip. Clears the way for the write when overwriting.
fn prepare_target(target: &Path, options: &MirrorOptions) -> Result<bool> {
    let existing = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };

    if !options.overwrite {
        if options.error_on_exist {
            return Err(MirrorError::DestinationExists(target.to_path_buf()));
        }
        return Ok(false);
    }

    // fs::copy writes through links and cannot replace a directory
    if existing.is_dir() {
        fs::remove_dir_all(target)?;
    } else if existing.file_type().is_symlink() {
        fs::remove_file(target)?;
    }
    Ok(true)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    tracing::debug!(link = %link.display(), "Copying symlink target content");
    fs::copy(link, target)?;
    Ok(())
}

/// Remove every entry inside `dir`, keeping (or creating) `dir` itself
pub fn empty_dir(dir: &Path) -> Result<TreeStats> {
    let mut stats = TreeStats::default();
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        stats.removed += 1;
    }
    Ok(stats)
}

/// List every entry below `root` (not the root itself), without following links
///
/// Directories come before their contents.
pub fn list_tree(root: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry?;
        entries.push((entry.path().to_path_buf(), entry.file_type().is_dir()));
    }
    Ok(entries)
}

/// Create `dir` and any missing parents
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Copy one file to `target`, replacing whatever is there
///
/// A symlink source is recreated as a link rather than followed.
pub async fn copy_file(from: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        ensure_dir(parent).await?;
    }
    match tokio::fs::symlink_metadata(target).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(target).await?,
        Ok(meta) if meta.file_type().is_symlink() => tokio::fs::remove_file(target).await?,
        _ => {}
    }

    if tokio::fs::symlink_metadata(from).await?.file_type().is_symlink() {
        let (from, target) = (from.to_path_buf(), target.to_path_buf());
        return tokio::task::spawn_blocking(move || copy_symlink(&from, &target)).await?;
    }
    tokio::fs::copy(from, target).await?;
    Ok(())
}

/// Remove `path` and anything below it; a missing path is not an error
///
/// Returns whether something was removed.
pub async fn remove_path(path: &Path) -> Result<bool> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(true)
}
