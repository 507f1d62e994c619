//! Outcome reports for bulk operations
//!
//! Bulk operators never fail as a whole. Each mapping gets its own outcome,
//! and callers that only want the legacy success line can use
//! [`SyncReport::message`].

use super::mapping::MappingId;
use crate::fs_ops::TreeStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which bulk operation produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    Copy,
    Clean,
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkOperation::Copy => write!(f, "copy"),
            BulkOperation::Clean => write!(f, "clean"),
        }
    }
}

/// Result of a bulk operation on one mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingOutcome {
    pub id: MappingId,
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub stats: TreeStats,
    /// Error text when the mapping failed (stats are then empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MappingOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-mapping outcomes of one bulk operation, in registry order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub operation: BulkOperation,
    pub outcomes: Vec<MappingOutcome>,
}

impl SyncReport {
    pub fn new(operation: BulkOperation, outcomes: Vec<MappingOutcome>) -> Self {
        Self {
            operation,
            outcomes,
        }
    }

    /// Legacy completion line, returned whether or not every mapping succeeded
    pub fn message(&self) -> &'static str {
        match self.operation {
            BulkOperation::Copy => "Folders copied successfully",
            BulkOperation::Clean => "Directories cleaned successfully",
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(MappingOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MappingOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Sum of the stats of every mapping
    pub fn totals(&self) -> TreeStats {
        self.outcomes.iter().fold(TreeStats::default(), |mut acc, o| {
            acc.files_copied += o.stats.files_copied;
            acc.directories_created += o.stats.directories_created;
            acc.skipped += o.stats.skipped;
            acc.removed += o.stats.removed;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: u64, error: Option<&str>, files: usize) -> MappingOutcome {
        MappingOutcome {
            id: MappingId::new(id),
            source: PathBuf::from(format!("/src/{}", id)),
            destination: PathBuf::from(format!("/dst/{}", id)),
            stats: TreeStats {
                files_copied: files,
                ..Default::default()
            },
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_message_is_generic_even_on_failure() {
        let report = SyncReport::new(
            BulkOperation::Copy,
            vec![outcome(1, None, 3), outcome(2, Some("boom"), 0)],
        );
        assert_eq!(report.message(), "Folders copied successfully");
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.totals().files_copied, 3);
    }

    #[test]
    fn test_json_shape() {
        let report = SyncReport::new(BulkOperation::Clean, vec![outcome(1, None, 0)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["operation"], "clean");
        assert!(json["outcomes"][0].get("error").is_none());
        assert_eq!(json["outcomes"][0]["id"], 1);
    }
}
