//! dirmirror - Mirror source directories into destinations
//!
//! Registers (source, destination) folder pairs, copies or cleans them in
//! bulk, and keeps destinations in sync while sources change.
//!
//! # Architecture
//!
//! - **mirror**: Mapping registry, bulk operators and the [`Mirror`] facade
//! - **watch**: Filesystem watching and event-to-action translation
//! - **fs_ops**: Filesystem primitives (copy tree, empty dir, remove)
//! - **config**: YAML configuration and validation
//! - **logging**: Tracing setup and the injectable log sink

pub mod config;
pub mod error;
pub mod fs_ops;
pub mod logging;
pub mod mirror;
pub mod watch;

// Re-exports
pub use error::{MirrorError, Result};
pub use mirror::{MappingId, MappingOptions, Mirror, MirrorOptions, PathFilter, SyncReport};
pub use watch::SyncEvent;
