//! dirmirror configuration file handling

use super::validation::validate_config_result;
use crate::mirror::{absolute_path, MappingOptions, Mirror, PathFilter};
use crate::logging::MirrorLog;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "dirmirror.yaml";

/// One folder pair as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub source: PathBuf,
    pub destination: PathBuf,

    /// Unset keeps the default (true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,

    /// Unset keeps the default (false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_on_exist: Option<bool>,

    /// Glob patterns (relative to the source) a file must match to be copied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Glob patterns (relative to the source) excluded from copies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl MappingConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            overwrite: None,
            error_on_exist: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Option overrides for this mapping, with globs rooted at `source_root`
    pub fn options(&self, source_root: &Path) -> Result<MappingOptions> {
        let mut options = MappingOptions {
            overwrite: self.overwrite,
            error_on_exist: self.error_on_exist,
            filter: None,
        };
        if !self.include.is_empty() || !self.exclude.is_empty() {
            options.filter = Some(PathFilter::from_globs(&self.include, &self.exclude, source_root)?);
        }
        Ok(options)
    }
}

/// Contents of a dirmirror configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Directory relative paths resolve against; defaults to the working
    /// directory. A relative base dir is itself resolved against the
    /// config file's directory when loaded from disk, and is absolute
    /// afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

impl MirrorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starter config with the usual src -> dist pairs
    pub fn sample() -> Self {
        let mut config = Self::new();
        config.add_mapping(MappingConfig::new("src/imgs", "dist/imgs"));
        config.add_mapping(MappingConfig::new("src/logos", "dist/logos"));
        config
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::MirrorError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), "Loading dirmirror configuration");

        let content = fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;

        if let Some(base) = config.base_dir.take() {
            let anchor = path.parent().unwrap_or_else(|| Path::new(""));
            config.base_dir = Some(absolute_path(&anchor.join(base))?);
        }

        tracing::debug!(mappings = config.mappings.len(), "Configuration loaded successfully");

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!(path = %path.display(), "Saving dirmirror configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    pub fn add_mapping(&mut self, mapping: MappingConfig) {
        self.mappings.push(mapping);
    }

    /// Validate, then register every mapping on a new [`Mirror`]
    ///
    /// Directories are created only once the whole file validated.
    pub fn into_mirror(self, log: Arc<dyn MirrorLog>) -> Result<Mirror> {
        validate_config_result(&self)?;

        let mut mirror = match &self.base_dir {
            Some(base) => Mirror::with_base_dir(base.clone()),
            None => Mirror::new(),
        }
        .with_log(log);

        for mapping in &self.mappings {
            let root = crate::mirror::normalize_path(mirror.registry().base_dir(), &mapping.source);
            let options = mapping.options(&root)?;
            mirror.add(&mapping.source, &mapping.destination, options)?;
        }

        Ok(mirror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TracingLog;
    use tempfile::TempDir;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
base_dir: /work/site
mappings:
  - source: src/imgs
    destination: dist/imgs
  - source: src/docs
    destination: dist/docs
    overwrite: false
    error_on_exist: true
    exclude: ["*.tmp"]
"#;
        let config: MirrorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.base_dir, Some(PathBuf::from("/work/site")));
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].overwrite, None);
        assert_eq!(config.mappings[1].overwrite, Some(false));
        assert_eq!(config.mappings[1].exclude, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn test_save_and_load_resolves_relative_base_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf/dirmirror.yaml");

        let mut config = MirrorConfig::sample();
        config.base_dir = Some(PathBuf::from(".."));
        config.save(&path).unwrap();

        let loaded = MirrorConfig::load(&path).unwrap();
        assert_eq!(loaded.mappings, config.mappings);
        assert_eq!(loaded.base_dir, Some(temp.path().to_path_buf()));

        let mirror = loaded.into_mirror(Arc::new(TracingLog)).unwrap();
        assert_eq!(mirror.mappings()[0].source, temp.path().join("src/imgs"));
        assert!(temp.path().join("src/imgs").is_dir());
        assert!(!temp.path().join("conf/src").exists());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = MirrorConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, crate::MirrorError::Config(_)));
    }

    #[test]
    fn test_into_mirror_registers_mappings() {
        let temp = TempDir::new().unwrap();
        let mut config = MirrorConfig::sample();
        config.base_dir = Some(temp.path().to_path_buf());
        config.mappings[1].exclude = vec!["*.tmp".to_string()];

        let mirror = config.into_mirror(Arc::new(TracingLog)).unwrap();

        assert_eq!(mirror.mappings().len(), 2);
        assert!(temp.path().join("dist/logos").is_dir());
        let logos = &mirror.mappings()[1];
        assert!(!logos.options.filter.accepts(&logos.source.join("x.tmp")));
    }

    #[test]
    fn test_into_mirror_rejects_invalid_config_before_touching_disk() {
        let temp = TempDir::new().unwrap();
        let mut config = MirrorConfig::new();
        config.base_dir = Some(temp.path().to_path_buf());
        config.add_mapping(MappingConfig::new("a", "out/a"));
        config.add_mapping(MappingConfig::new("./a", "out/b"));

        assert!(config.into_mirror(Arc::new(TracingLog)).is_err());
        assert!(!temp.path().join("out").exists());
    }
}
