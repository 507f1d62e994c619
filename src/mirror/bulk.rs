//! Bulk operators
//!
//! `copy` and `clean` run once per mapping, all mappings concurrently. A
//! failing mapping is logged and reported; it never aborts the others.

use super::mapping::Mapping;
use super::report::{BulkOperation, MappingOutcome, SyncReport};
use crate::fs_ops::{self, TreeStats};
use crate::logging::MirrorLog;
use crate::{MirrorError, Result};
use futures::future::join_all;
use std::sync::Arc;

/// Copy every mapping's source tree into its destination
pub async fn copy_all(mappings: Vec<Mapping>, log: Arc<dyn MirrorLog>) -> SyncReport {
    run_all(BulkOperation::Copy, mappings, log, |mapping| {
        fs_ops::copy_tree(&mapping.source, &mapping.destination, &mapping.options)
    })
    .await
}

/// Empty every mapping's destination directory
pub async fn clean_all(mappings: Vec<Mapping>, log: Arc<dyn MirrorLog>) -> SyncReport {
    run_all(BulkOperation::Clean, mappings, log, |mapping| {
        fs_ops::empty_dir(&mapping.destination)
    })
    .await
}

async fn run_all<F>(
    operation: BulkOperation,
    mappings: Vec<Mapping>,
    log: Arc<dyn MirrorLog>,
    work: F,
) -> SyncReport
where
    F: Fn(&Mapping) -> Result<TreeStats> + Send + Sync + Copy + 'static,
{
    let tasks = mappings.into_iter().map(|mapping| {
        let log = Arc::clone(&log);
        async move {
            let job = mapping.clone();
            let result = tokio::task::spawn_blocking(move || work(&job))
                .await
                .map_err(MirrorError::from)
                .and_then(|r| r);
            outcome_for(operation, mapping, result, log.as_ref())
        }
    });

    SyncReport::new(operation, join_all(tasks).await)
}

fn outcome_for(
    operation: BulkOperation,
    mapping: Mapping,
    result: Result<TreeStats>,
    log: &dyn MirrorLog,
) -> MappingOutcome {
    let (stats, error) = match result {
        Ok(stats) => {
            tracing::debug!(id = %mapping.id, ?stats, "{} finished", operation);
            (stats, None)
        }
        Err(err) => {
            let message = match operation {
                BulkOperation::Copy => format!(
                    "Error copying folder from {} to {}",
                    mapping.source.display(),
                    mapping.destination.display()
                ),
                BulkOperation::Clean => {
                    format!("Error cleaning directory {}", mapping.destination.display())
                }
            };
            log.error(&message, &err);
            (TreeStats::default(), Some(err.to_string()))
        }
    };

    MappingOutcome {
        id: mapping.id,
        source: mapping.source,
        destination: mapping.destination,
        stats,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::MemoryLog;
    use crate::mirror::{MappingOptions, MappingRegistry};
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_one_failing_mapping_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());
        registry
            .add("a", "out/a", MappingOptions::new().with_overwrite(false).with_error_on_exist(true))
            .unwrap();
        registry.add("b", "out/b", MappingOptions::default()).unwrap();
        fs::write(temp.path().join("a/f.txt"), "a").unwrap();
        fs::write(temp.path().join("out/a/f.txt"), "existing").unwrap();
        fs::write(temp.path().join("b/g.txt"), "b").unwrap();

        let log = Arc::new(MemoryLog::default());
        let report = copy_all(registry.mappings().to_vec(), log.clone()).await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.outcomes[0].is_success());
        assert!(report.outcomes[1].is_success());
        assert_eq!(fs::read_to_string(temp.path().join("out/b/g.txt")).unwrap(), "b");
        assert!(log.contains("Error copying folder from"));
        assert_eq!(report.message(), "Folders copied successfully");
    }

    #[tokio::test]
    async fn test_clean_empties_every_destination() {
        let temp = TempDir::new().unwrap();
        let mut registry = MappingRegistry::with_base_dir(temp.path());
        registry.add("a", "out/a", MappingOptions::default()).unwrap();
        registry.add("b", "out/b", MappingOptions::default()).unwrap();
        fs::write(temp.path().join("out/a/x.txt"), "x").unwrap();
        fs::create_dir_all(temp.path().join("out/b/deep/er")).unwrap();

        let report = clean_all(registry.mappings().to_vec(), Arc::new(MemoryLog::default())).await;

        assert!(report.is_success());
        assert_eq!(report.totals().removed, 2);
        for dir in ["out/a", "out/b"] {
            let dir = temp.path().join(dir);
            assert!(dir.is_dir());
            assert_eq!(fs::read_dir(dir).unwrap().count(), 0);
        }
    }
}
