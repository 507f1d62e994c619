//! Configuration system
//!
//! Loads the mapping list from a YAML file (`dirmirror.yaml` by default) with:
//! - An optional base directory that relative paths resolve against
//! - Per-mapping overwrite / error-on-exist overrides
//! - Include and exclude glob patterns turned into copy filters

mod mirror_config;
pub mod validation;

pub use mirror_config::{MappingConfig, MirrorConfig, DEFAULT_CONFIG_FILE};
pub use validation::{validate_config, validate_config_result, ValidationError};
