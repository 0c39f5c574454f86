//! Build summary records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::BuildStatus;

/// Live build summary of one pipeline.
///
/// Counters aggregate every build of the pipeline. The `latest_*` fields
/// describe the most recently started build only and are replaced, never
/// merged, when a newer build starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Pipeline this summary belongs to.
    pub pipeline_id: String,
    /// Project owning the pipeline.
    pub project_id: String,
    /// Display build number, may be set manually.
    pub build_no: i32,
    /// Number of build numbers allocated so far.
    pub build_num: i32,
    /// Builds waiting in the queue.
    pub queue_count: i32,
    /// Builds currently executing.
    pub running_count: i32,
    /// Builds that reached a terminal status.
    pub finish_count: i32,
    /// Most recently started build.
    pub latest_build_id: Option<String>,
    /// Task currently executing in the latest build.
    pub latest_task_id: Option<String>,
    /// Name of the task currently executing in the latest build.
    pub latest_task_name: Option<String>,
    /// Number of tasks in the latest build.
    pub latest_task_count: Option<i32>,
    /// User who started the latest build.
    pub latest_start_user: Option<String>,
    /// When the latest build started.
    pub latest_start_time: Option<Timestamp>,
    /// When the latest build (or one of its stages) last finished.
    pub latest_end_time: Option<Timestamp>,
    /// Status of the latest build.
    pub latest_status: Option<BuildStatus>,
}

impl BuildSummary {
    /// Creates an empty summary with all counters at zero.
    pub fn new(new: NewBuildSummary) -> Self {
        Self {
            pipeline_id: new.pipeline_id,
            project_id: new.project_id,
            build_no: new.build_no,
            build_num: 0,
            queue_count: 0,
            running_count: 0,
            finish_count: 0,
            latest_build_id: None,
            latest_task_id: None,
            latest_task_name: None,
            latest_task_count: None,
            latest_start_user: None,
            latest_start_time: None,
            latest_end_time: None,
            latest_status: None,
        }
    }

    /// Returns the three counters.
    #[inline]
    pub fn counters(&self) -> SummaryCounters {
        SummaryCounters {
            queue_count: self.queue_count,
            running_count: self.running_count,
            finish_count: self.finish_count,
        }
    }

    /// Returns whether the given build is the latest started build.
    pub fn is_latest(&self, build_id: &str) -> bool {
        self.latest_build_id.as_deref() == Some(build_id)
    }

    /// Returns the number of builds not yet finished.
    #[inline]
    pub fn unfinished_count(&self) -> i32 {
        self.queue_count + self.running_count
    }

    /// Returns whether any build is queued or running.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.unfinished_count() > 0
    }
}

/// Data for creating a pipeline's summary row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBuildSummary {
    /// Pipeline identifier (required).
    pub pipeline_id: String,
    /// Project identifier (required).
    pub project_id: String,
    /// Initial display build number.
    #[serde(default)]
    pub build_no: i32,
}

impl NewBuildSummary {
    /// Creates a new summary description with `build_no` at zero.
    pub fn new(pipeline_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            project_id: project_id.into(),
            build_no: 0,
        }
    }

    /// Sets the initial display build number.
    pub fn with_build_no(mut self, build_no: i32) -> Self {
        self.build_no = build_no;
        self
    }
}

/// Absolute counter values, used by reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounters {
    /// Builds waiting in the queue.
    pub queue_count: i32,
    /// Builds currently executing.
    pub running_count: i32,
    /// Builds that reached a terminal status.
    pub finish_count: i32,
}

impl SummaryCounters {
    /// Creates a counter snapshot.
    pub fn new(queue_count: i32, running_count: i32, finish_count: i32) -> Self {
        Self {
            queue_count,
            running_count,
            finish_count,
        }
    }

    /// Returns a copy with every negative counter raised to zero.
    pub fn clamped(self) -> Self {
        Self {
            queue_count: self.queue_count.max(0),
            running_count: self.running_count.max(0),
            finish_count: self.finish_count.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_summary_starts_empty() {
        let summary = BuildSummary::new(NewBuildSummary::new("p-1", "proj").with_build_no(7));
        assert_eq!(summary.build_no, 7);
        assert_eq!(summary.build_num, 0);
        assert_eq!(summary.counters(), SummaryCounters::default());
        assert!(summary.latest_build_id.is_none());
        assert!(!summary.is_busy());
    }

    #[test]
    fn latest_build_check() {
        let mut summary = BuildSummary::new(NewBuildSummary::new("p-1", "proj"));
        assert!(!summary.is_latest("b-1"));
        summary.latest_build_id = Some("b-1".to_owned());
        assert!(summary.is_latest("b-1"));
        assert!(!summary.is_latest("b-2"));
    }

    #[test]
    fn clamped_counters() {
        let counters = SummaryCounters::new(-2, 3, -1).clamped();
        assert_eq!(counters, SummaryCounters::new(0, 3, 0));
    }

    #[test]
    fn serializes_status_as_text() {
        let mut summary = BuildSummary::new(NewBuildSummary::new("p-1", "proj"));
        summary.latest_status = Some(BuildStatus::Running);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["latest_status"], "running");
        assert_eq!(json["queue_count"], 0);
    }
}
