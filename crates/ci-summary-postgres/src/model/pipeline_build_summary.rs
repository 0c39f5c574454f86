//! Build summary row of one pipeline.

use ci_summary_core::{BuildStatus, BuildSummary, NewBuildSummary, SummaryUpdate};
use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::TRACING_TARGET_QUERY;
use crate::schema::pipeline_build_summaries;

/// Row of `pipeline_build_summaries`.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pipeline_build_summaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineBuildSummary {
    /// Pipeline identifier.
    pub pipeline_id: String,
    /// Owning project.
    pub project_id: String,
    /// Display build number.
    pub build_no: i32,
    /// Allocated build number counter.
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
    /// Name of that task.
    pub latest_task_name: Option<String>,
    /// Number of tasks in the latest build.
    pub latest_task_count: Option<i32>,
    /// User who started the latest build.
    pub latest_start_user: Option<String>,
    /// When the latest build started.
    pub latest_start_time: Option<Timestamp>,
    /// When the latest build last finished a stage or the whole run.
    pub latest_end_time: Option<Timestamp>,
    /// Ordinal status code of the latest build.
    pub latest_status: Option<i32>,
}

/// Data for creating a summary row with zeroed counters.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = pipeline_build_summaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPipelineBuildSummary {
    /// Pipeline identifier (required).
    pub pipeline_id: String,
    /// Owning project (required).
    pub project_id: String,
    /// Initial display build number.
    pub build_no: i32,
}

/// Plain column sets of a summary update.
///
/// Counter arithmetic and the build number change are expressions on the
/// current row and are added by the query next to this changeset.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = pipeline_build_summaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdatePipelineBuildSummary {
    /// Display build number.
    pub build_no: Option<i32>,
    /// Latest build.
    pub latest_build_id: Option<Option<String>>,
    /// Current task, `Some(None)` clears it.
    pub latest_task_id: Option<Option<String>>,
    /// Current task name, `Some(None)` clears it.
    pub latest_task_name: Option<Option<String>>,
    /// Task count of the latest build.
    pub latest_task_count: Option<Option<i32>>,
    /// Start user of the latest build.
    pub latest_start_user: Option<Option<String>>,
    /// Start time of the latest build.
    pub latest_start_time: Option<Option<Timestamp>>,
    /// End time of the latest build.
    pub latest_end_time: Option<Option<Timestamp>>,
    /// Status code of the latest build.
    pub latest_status: Option<Option<i32>>,
}

impl UpdatePipelineBuildSummary {
    /// Returns whether no column would be set.
    pub fn is_empty(&self) -> bool {
        self.build_no.is_none()
            && self.latest_build_id.is_none()
            && self.latest_task_id.is_none()
            && self.latest_task_name.is_none()
            && self.latest_task_count.is_none()
            && self.latest_start_user.is_none()
            && self.latest_start_time.is_none()
            && self.latest_end_time.is_none()
            && self.latest_status.is_none()
    }
}

impl From<&SummaryUpdate> for UpdatePipelineBuildSummary {
    fn from(update: &SummaryUpdate) -> Self {
        Self {
            build_no: update.build_no,
            latest_build_id: update.latest_build_id.clone().map(Some),
            latest_task_id: update.latest_task_id.clone(),
            latest_task_name: update.latest_task_name.clone(),
            latest_task_count: update.latest_task_count.map(Some),
            latest_start_user: update.latest_start_user.clone().map(Some),
            latest_start_time: update.latest_start_time.map(|at| Some(at.into())),
            latest_end_time: update.latest_end_time.map(|at| Some(at.into())),
            latest_status: update.latest_status.map(|status| Some(status.code())),
        }
    }
}

impl From<NewBuildSummary> for NewPipelineBuildSummary {
    fn from(new: NewBuildSummary) -> Self {
        Self {
            pipeline_id: new.pipeline_id,
            project_id: new.project_id,
            build_no: new.build_no,
        }
    }
}

impl PipelineBuildSummary {
    /// Returns the decoded status of the latest build.
    ///
    /// Codes this version does not know decode as `None`.
    pub fn status(&self) -> Option<BuildStatus> {
        let code = self.latest_status?;
        let status = BuildStatus::from_code(code);
        if status.is_none() {
            tracing::warn!(
                target: TRACING_TARGET_QUERY,
                pipeline_id = %self.pipeline_id,
                code,
                "Unknown build status code"
            );
        }
        status
    }
}

impl From<PipelineBuildSummary> for BuildSummary {
    fn from(row: PipelineBuildSummary) -> Self {
        let latest_status = row.status();
        Self {
            pipeline_id: row.pipeline_id,
            project_id: row.project_id,
            build_no: row.build_no,
            build_num: row.build_num,
            queue_count: row.queue_count,
            running_count: row.running_count,
            finish_count: row.finish_count,
            latest_build_id: row.latest_build_id,
            latest_task_id: row.latest_task_id,
            latest_task_name: row.latest_task_name,
            latest_task_count: row.latest_task_count,
            latest_start_user: row.latest_start_user,
            latest_start_time: row.latest_start_time.map(Into::into),
            latest_end_time: row.latest_end_time.map(Into::into),
            latest_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> PipelineBuildSummary {
        PipelineBuildSummary {
            pipeline_id: "p-1".to_owned(),
            project_id: "proj".to_owned(),
            build_no: 4,
            build_num: 9,
            queue_count: 1,
            running_count: 2,
            finish_count: 3,
            latest_build_id: Some("b-9".to_owned()),
            latest_task_id: None,
            latest_task_name: None,
            latest_task_count: Some(5),
            latest_start_user: Some("alice".to_owned()),
            latest_start_time: Some(jiff::Timestamp::UNIX_EPOCH.into()),
            latest_end_time: None,
            latest_status: Some(BuildStatus::Running.code()),
        }
    }

    #[test]
    fn row_into_summary() {
        let summary = BuildSummary::from(row());
        assert_eq!(summary.counters().running_count, 2);
        assert_eq!(summary.latest_status, Some(BuildStatus::Running));
        assert_eq!(summary.latest_start_time, Some(jiff::Timestamp::UNIX_EPOCH));
        assert!(summary.is_latest("b-9"));
    }

    #[test]
    fn unknown_status_code_decodes_as_none() {
        let mut row = row();
        row.latest_status = Some(999);
        assert_eq!(row.status(), None);
        assert_eq!(BuildSummary::from(row).latest_status, None);
    }

    #[test]
    fn changeset_from_update() {
        let update = SummaryUpdate::new()
            .queue(-1)
            .latest_build("b-10")
            .clear_current_task()
            .status(BuildStatus::Running);
        let changeset = UpdatePipelineBuildSummary::from(&update);

        assert_eq!(changeset.latest_build_id, Some(Some("b-10".to_owned())));
        assert_eq!(changeset.latest_task_id, Some(None));
        assert_eq!(changeset.latest_status, Some(Some(BuildStatus::Running.code())));
        assert_eq!(changeset.build_no, None);
        assert!(!changeset.is_empty());

        let counters_only = UpdatePipelineBuildSummary::from(&SummaryUpdate::new().finish(1));
        assert!(counters_only.is_empty());
    }
}
