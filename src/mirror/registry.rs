//! Mapping registry
//!
//! Holds validated mappings in insertion order. Paths are resolved against an
//! absolute base directory (the working directory unless told otherwise) and
//! both sides are normalized before the duplicate check, so `a/b` and `./a/b`
//! name the same source.

use super::mapping::{absolute_path, normalize_path, Mapping, MappingId, MappingOptions, MirrorOptions};
use crate::{MirrorError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered collection of mappings
#[derive(Debug)]
pub struct MappingRegistry {
    base_dir: PathBuf,
    mappings: Vec<Mapping>,
    next_id: u64,
}

impl MappingRegistry {
    /// Registry resolving relative paths against the current working directory
    pub fn new() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_base_dir(base_dir)
    }

    /// Registry resolving relative paths against `base_dir`
    ///
    /// A relative `base_dir` is anchored at the current working directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            base_dir: absolute_path(&base_dir).unwrap_or(base_dir),
            mappings: Vec::new(),
            next_id: 1,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Register a folder pair
    ///
    /// Both directories are created (recursively) if missing. Fails with
    /// [`MirrorError::InvalidArgument`] for blank paths and with
    /// [`MirrorError::DuplicateSource`] when the normalized source is
    /// already registered; nothing is created or stored in either case.
    /// Source and destination may not be nested in one another: watching
    /// would mirror the destination into itself, and cleaning would wipe
    /// the source.
    pub fn add(
        &mut self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        options: MappingOptions,
    ) -> Result<MappingId> {
        validate_dir(source.as_ref(), "source")?;
        validate_dir(destination.as_ref(), "destination")?;

        if !self.base_dir.is_absolute() {
            self.base_dir = absolute_path(&self.base_dir)?;
        }
        let source = normalize_path(&self.base_dir, source.as_ref());
        let destination = normalize_path(&self.base_dir, destination.as_ref());

        if destination.starts_with(&source) || source.starts_with(&destination) {
            return Err(MirrorError::InvalidArgument(format!(
                "source {} and destination {} must not be nested in one another",
                source.display(),
                destination.display()
            )));
        }

        if self.contains_source(&source) {
            return Err(MirrorError::DuplicateSource(source));
        }

        fs::create_dir_all(&source)?;
        fs::create_dir_all(&destination)?;

        let id = MappingId::new(self.next_id);
        self.next_id += 1;

        tracing::debug!(%id, source = %source.display(), destination = %destination.display(), "Registered mapping");

        self.mappings.push(Mapping {
            id,
            source,
            destination,
            options: MirrorOptions::default().merge(options),
        });

        Ok(id)
    }

    /// Drop a mapping from the registry
    pub fn remove(&mut self, id: MappingId) -> Result<Mapping> {
        let index = self
            .mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or(MirrorError::UnknownMapping(id))?;
        Ok(self.mappings.remove(index))
    }

    pub fn get(&self, id: MappingId) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.id == id)
    }

    /// Whether `source` (resolved against the base dir) is already registered
    pub fn contains_source(&self, source: &Path) -> bool {
        let source = normalize_path(&self.base_dir, source);
        self.mappings.iter().any(|m| m.source == source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter()
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for MappingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_dir(dir: &Path, which: &str) -> Result<()> {
    let blank = dir
        .to_str()
        .map(|s| s.trim().is_empty())
        .unwrap_or_else(|| dir.as_os_str().is_empty());
    if blank {
        return Err(MirrorError::InvalidArgument(format!(
            "{} directory path must be a non-empty string",
            which
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_creates_both_directories() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        let id = registry
            .add("src/imgs", "dist/imgs", MappingOptions::default())
            .unwrap();

        assert!(temp.path().join("src/imgs").is_dir());
        assert!(temp.path().join("dist/imgs").is_dir());
        let mapping = registry.get(id).unwrap();
        assert_eq!(mapping.source, temp.path().join("src/imgs"));
        assert_eq!(mapping.destination, temp.path().join("dist/imgs"));
    }

    #[test]
    fn test_blank_paths_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        for (src, dst) in [("", "dist"), ("src", ""), ("   ", "dist")] {
            let err = registry.add(src, dst, MappingOptions::default()).unwrap_err();
            assert!(matches!(err, MirrorError::InvalidArgument(_)));
        }
        assert!(registry.is_empty());
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn test_duplicate_raw_source_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        registry.add("src", "dist/a", MappingOptions::default()).unwrap();
        let err = registry
            .add("src", "dist/b", MappingOptions::default())
            .unwrap_err();

        assert!(matches!(err, MirrorError::DuplicateSource(_)));
        assert_eq!(registry.len(), 1);
        assert!(!temp.path().join("dist/b").exists());
    }

    #[test]
    fn test_duplicate_detection_normalizes_both_sides() {
        // Different spellings of one directory count as the same source.
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        registry.add("src/imgs", "dist/a", MappingOptions::default()).unwrap();

        let absolute = temp.path().join("src/imgs");
        for spelling in [
            PathBuf::from("./src/imgs"),
            PathBuf::from("src/logos/../imgs"),
            absolute,
        ] {
            let err = registry
                .add(&spelling, "dist/b", MappingOptions::default())
                .unwrap_err();
            assert!(matches!(err, MirrorError::DuplicateSource(_)), "{:?}", spelling);
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_nested_source_and_destination_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        for (src, dst) in [("src", "src/out"), ("dist/src", "dist"), ("same", "./same")] {
            let err = registry.add(src, dst, MappingOptions::default()).unwrap_err();
            assert!(matches!(err, MirrorError::InvalidArgument(_)), "{} -> {}", src, dst);
        }
        assert!(registry.is_empty());
        assert!(!temp.path().join("src").exists());
        assert!(!temp.path().join("dist").exists());

        // Siblings sharing a name prefix are not nested
        registry.add("src", "src-out", MappingOptions::default()).unwrap();
    }

    #[test]
    fn test_relative_base_dir_is_made_absolute() {
        let registry = MappingRegistry::with_base_dir("some/project");
        assert!(registry.base_dir().is_absolute());
        assert_eq!(
            registry.base_dir(),
            std::env::current_dir().unwrap().join("some/project")
        );
    }

    #[test]
    fn test_options_are_merged_over_defaults() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        let id = registry
            .add("src", "dist", MappingOptions::new().with_overwrite(false))
            .unwrap();

        let options = &registry.get(id).unwrap().options;
        assert!(!options.overwrite);
        assert!(!options.error_on_exist);
    }

    #[test]
    fn test_ids_are_stable_across_removal() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());

        let first = registry.add("a", "x", MappingOptions::default()).unwrap();
        let second = registry.add("b", "y", MappingOptions::default()).unwrap();
        registry.remove(first).unwrap();
        let third = registry.add("a", "x", MappingOptions::default()).unwrap();

        assert_ne!(first, third);
        assert_eq!(registry.get(second).unwrap().source, temp.path().join("b"));
        assert!(matches!(
            registry.remove(first),
            Err(MirrorError::UnknownMapping(_))
        ));
        let order: Vec<_> = registry.iter().map(|m| m.id).collect();
        assert_eq!(order, vec![second, third]);
    }
}
