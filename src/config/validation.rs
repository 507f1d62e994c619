//! Configuration validation
//!
//! Validates a dirmirror configuration before anything touches the disk:
//! - At least one mapping, with non-blank paths
//! - No two mappings with the same source (after path normalization)
//! - Destination and source never nested in one another
//! - Glob patterns compile

use super::mirror_config::{MappingConfig, MirrorConfig};
use crate::mirror::{absolute_path, normalize_path};
use crate::MirrorError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Index of the offending mapping, if the error is mapping-specific
    pub mapping: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            mapping: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn for_mapping(mut self, index: usize) -> Self {
        self.mapping = Some(index);
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(index) = self.mapping {
            write!(f, "[mappings.{}] {}: {}", index, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a dirmirror configuration
pub fn validate_config(config: &MirrorConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.mappings.is_empty() {
        errors.push(ValidationError::new(
            "mappings",
            "At least one mapping must be defined",
        ));
    }

    let base = config.base_dir.clone().unwrap_or_default();
    let base = absolute_path(&base).unwrap_or(base);

    let mut seen: HashMap<PathBuf, usize> = HashMap::new();
    for (index, mapping) in config.mappings.iter().enumerate() {
        if let Err(mut mapping_errors) = validate_mapping(mapping, &base) {
            for e in mapping_errors.iter_mut() {
                e.mapping = Some(index);
            }
            errors.append(&mut mapping_errors);
            continue;
        }

        let source = normalize_path(&base, &mapping.source);
        if let Some(first) = seen.get(&source) {
            errors.push(
                ValidationError::new(
                    "source",
                    format!(
                        "Duplicate source {} (already used by mappings.{})",
                        source.display(),
                        first
                    ),
                )
                .for_mapping(index),
            );
        } else {
            seen.insert(source, index);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a single mapping
fn validate_mapping(mapping: &MappingConfig, base: &Path) -> ValidationResult {
    let mut errors = Vec::new();

    if is_blank(&mapping.source) {
        errors.push(ValidationError::new("source", "Source path cannot be empty"));
    }
    if is_blank(&mapping.destination) {
        errors.push(ValidationError::new(
            "destination",
            "Destination path cannot be empty",
        ));
    }

    if errors.is_empty() {
        let source = normalize_path(base, &mapping.source);
        let destination = normalize_path(base, &mapping.destination);
        if destination.starts_with(&source) {
            errors.push(ValidationError::new(
                "destination",
                format!(
                    "Destination {} is inside source {}",
                    destination.display(),
                    source.display()
                ),
            ));
        } else if source.starts_with(&destination) {
            errors.push(ValidationError::new(
                "destination",
                format!(
                    "Source {} is inside destination {} (clean would delete it)",
                    source.display(),
                    destination.display()
                ),
            ));
        }
    }

    for (field, patterns) in [("include", &mapping.include), ("exclude", &mapping.exclude)] {
        for pattern in patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError::new(
                    field,
                    format!("Invalid glob pattern '{}': {}", pattern, e),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_blank(path: &Path) -> bool {
    path.to_str()
        .map(|s| s.trim().is_empty())
        .unwrap_or_else(|| path.as_os_str().is_empty())
}

/// Validate and convert errors to a crate error
pub fn validate_config_result(config: &MirrorConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        MirrorError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
