//! Mapping types
//!
//! A [`Mapping`] is one registered (source, destination, options) triple.
//! Options are merged from explicit per-mapping overrides over defaults,
//! one field at a time.

use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Stable identifier of a registered mapping
///
/// Ids are handed out by the registry in insertion order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MappingId(u64);

impl MappingId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Predicate selecting which entries take part in a bulk copy
///
/// Called with the absolute source path of every entry, the mapping root
/// included. Rejecting a directory skips everything below it.
#[derive(Clone)]
pub struct PathFilter(Arc<dyn Fn(&Path) -> bool + Send + Sync>);

impl PathFilter {
    pub fn new(predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Filter that accepts every entry
    pub fn accept_all() -> Self {
        Self::new(|_| true)
    }

    /// Build a filter from glob patterns matched against paths relative to `root`
    ///
    /// An entry matching any `exclude` pattern is rejected. When `include` is
    /// non-empty, files must match at least one include pattern; directories
    /// are always descended into so nested matches can still be found.
    pub fn from_globs(include: &[String], exclude: &[String], root: &Path) -> Result<Self> {
        let include = compile_patterns(include)?;
        let exclude = compile_patterns(exclude)?;
        if include.is_empty() && exclude.is_empty() {
            return Ok(Self::accept_all());
        }

        let root = root.to_path_buf();
        Ok(Self::new(move |path| {
            let relative = match path.strip_prefix(&root) {
                Ok(rel) if rel.as_os_str().is_empty() => return true,
                Ok(rel) => rel,
                Err(_) => path,
            };
            if exclude.iter().any(|p| p.matches_path(relative)) {
                return false;
            }
            if include.is_empty() || path.is_dir() {
                return true;
            }
            include.iter().any(|p| p.matches_path(relative))
        }))
    }

    pub fn accepts(&self, path: &Path) -> bool {
        (self.0)(path)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PathFilter(..)")
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| MirrorError::Config(format!("Invalid glob pattern '{}': {}", p, e)))
        })
        .collect()
}

/// Effective options of a mapping
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Replace entries that already exist at the destination
    pub overwrite: bool,

    /// With `overwrite` off, treat an existing destination entry as an error
    /// instead of silently skipping it
    pub error_on_exist: bool,

    /// Selects the entries that bulk copy considers
    pub filter: PathFilter,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            error_on_exist: false,
            filter: PathFilter::accept_all(),
        }
    }
}

impl MirrorOptions {
    /// Apply explicit overrides on top of these options, field by field
    pub fn merge(mut self, overrides: MappingOptions) -> Self {
        if let Some(overwrite) = overrides.overwrite {
            self.overwrite = overwrite;
        }
        if let Some(error_on_exist) = overrides.error_on_exist {
            self.error_on_exist = error_on_exist;
        }
        if let Some(filter) = overrides.filter {
            self.filter = filter;
        }
        self
    }
}

/// Caller-supplied option overrides; unset fields keep their defaults
#[derive(Debug, Clone, Default)]
pub struct MappingOptions {
    pub overwrite: Option<bool>,
    pub error_on_exist: Option<bool>,
    pub filter: Option<PathFilter>,
}

impl MappingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn with_error_on_exist(mut self, error_on_exist: bool) -> Self {
        self.error_on_exist = Some(error_on_exist);
        self
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// A registered folder pair
#[derive(Debug, Clone)]
pub struct Mapping {
    pub id: MappingId,
    /// Absolute, normalized source directory
    pub source: PathBuf,
    /// Absolute, normalized destination directory
    pub destination: PathBuf,
    pub options: MirrorOptions,
}

impl Mapping {
    /// Destination counterpart of `path`, or `None` if `path` is outside the source
    pub fn target_for(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.source).ok()?;
        if relative.as_os_str().is_empty() {
            return Some(self.destination.clone());
        }
        Some(self.destination.join(relative))
    }
}

/// Resolve `path` against `base` and collapse `.` and `..` lexically
///
/// Absolute inputs ignore `base`. Symlinks are not resolved. A `..` that has
/// nothing left to pop is kept on a relative result and dropped at the root.
pub fn normalize_path(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
        }
    }
    normalized
}

/// Make `path` absolute against the working directory, then normalize it
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path, Path::new("")));
    }
    Ok(normalize_path(&std::env::current_dir()?, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MirrorOptions::default();
        assert!(options.overwrite);
        assert!(!options.error_on_exist);
        assert!(options.filter.accepts(Path::new("/anything")));
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let merged = MirrorOptions::default().merge(MappingOptions::new().with_error_on_exist(true));
        assert!(merged.overwrite);
        assert!(merged.error_on_exist);

        let merged = MirrorOptions::default().merge(
            MappingOptions::new()
                .with_overwrite(false)
                .with_filter(PathFilter::new(|p| p.extension().is_none())),
        );
        assert!(!merged.overwrite);
        assert!(!merged.error_on_exist);
        assert!(!merged.filter.accepts(Path::new("/a/b.txt")));
        assert!(merged.filter.accepts(Path::new("/a/b")));
    }

    #[test]
    fn test_normalize_path() {
        let base = Path::new("/work/project");
        assert_eq!(
            normalize_path(base, Path::new("src/imgs")),
            PathBuf::from("/work/project/src/imgs")
        );
        assert_eq!(
            normalize_path(base, Path::new("./src/../src/imgs/")),
            PathBuf::from("/work/project/src/imgs")
        );
        assert_eq!(
            normalize_path(base, Path::new("/abs/dir")),
            PathBuf::from("/abs/dir")
        );
    }

    #[test]
    fn test_normalize_path_keeps_unresolved_parent_dirs() {
        assert_eq!(
            normalize_path(Path::new("conf"), Path::new("../../shared")),
            PathBuf::from("../shared")
        );
        assert_eq!(
            normalize_path(Path::new(""), Path::new("../x")),
            PathBuf::from("../x")
        );
        assert_eq!(
            normalize_path(Path::new("/"), Path::new("../x")),
            PathBuf::from("/x")
        );
    }

    #[test]
    fn test_absolute_path() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_path(Path::new("a/./b")).unwrap(), cwd.join("a/b"));
        assert_eq!(
            absolute_path(Path::new("/work/x/../y")).unwrap(),
            PathBuf::from("/work/y")
        );
        assert!(absolute_path(Path::new("..")).unwrap().is_absolute());
    }

    #[test]
    fn test_target_for() {
        let mapping = Mapping {
            id: MappingId::new(1),
            source: PathBuf::from("/src"),
            destination: PathBuf::from("/dst"),
            options: MirrorOptions::default(),
        };
        assert_eq!(
            mapping.target_for(Path::new("/src/x/y.txt")),
            Some(PathBuf::from("/dst/x/y.txt"))
        );
        assert_eq!(mapping.target_for(Path::new("/src")), Some(PathBuf::from("/dst")));
        assert_eq!(mapping.target_for(Path::new("/other/y.txt")), None);
    }

    #[test]
    fn test_glob_filter() {
        let root = Path::new("/src");
        let filter =
            PathFilter::from_globs(&[], &["*.tmp".to_string()], root).unwrap();
        assert!(filter.accepts(Path::new("/src")));
        assert!(!filter.accepts(Path::new("/src/scratch.tmp")));
        assert!(filter.accepts(Path::new("/src/logo.png")));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = PathFilter::from_globs(&["[".to_string()], &[], Path::new("/src")).unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)));
    }
}
