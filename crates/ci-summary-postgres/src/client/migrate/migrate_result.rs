use std::time::Duration;

use serde::Serialize;

/// Applied and pending migration versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Versions recorded by the database, oldest first.
    pub applied_versions: Vec<String>,
    /// Embedded versions the database has not recorded yet, oldest first.
    pub pending_versions: Vec<String>,
}

impl MigrationStatus {
    /// Creates a migration status.
    pub fn new(applied_versions: Vec<String>, pending_versions: Vec<String>) -> Self {
        Self {
            applied_versions,
            pending_versions,
        }
    }

    /// Returns the last applied version, if any.
    pub fn last_applied_version(&self) -> Option<&str> {
        self.applied_versions.last().map(String::as_str)
    }

    /// Returns the next version to apply, if any.
    pub fn next_pending_version(&self) -> Option<&str> {
        self.pending_versions.first().map(String::as_str)
    }

    /// Returns the number of pending migrations.
    #[inline]
    pub fn pending_migrations(&self) -> usize {
        self.pending_versions.len()
    }

    /// Returns whether nothing is left to apply.
    #[inline]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_versions.is_empty()
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    /// Wall time of the run.
    pub duration: Duration,
    /// Versions applied by this run, oldest first.
    pub processed_versions: Vec<String>,
}

impl MigrationResult {
    /// Creates a result for a run that applied `processed_versions`.
    pub fn new(duration: Duration, processed_versions: Vec<String>) -> Self {
        Self {
            duration,
            processed_versions,
        }
    }

    /// Returns whether the run applied nothing.
    pub fn is_no_op(&self) -> bool {
        self.processed_versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_versions() {
        let status = MigrationStatus::new(
            vec!["20250601000000".to_owned()],
            vec!["20250601000100".to_owned()],
        );
        assert_eq!(status.last_applied_version(), Some("20250601000000"));
        assert_eq!(status.next_pending_version(), Some("20250601000100"));
        assert_eq!(status.pending_migrations(), 1);
        assert!(!status.is_up_to_date());

        let status = MigrationStatus::new(vec![], vec![]);
        assert!(status.is_up_to_date());
        assert_eq!(status.last_applied_version(), None);
    }

    #[test]
    fn no_op_result() {
        assert!(MigrationResult::new(Duration::ZERO, vec![]).is_no_op());
        assert!(!MigrationResult::new(Duration::ZERO, vec!["1".to_owned()]).is_no_op());
    }
}
