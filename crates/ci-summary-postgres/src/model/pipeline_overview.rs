//! Pipeline catalog rows joined with their build summary.

use ci_summary_core::BuildSummary;
use diesel::prelude::*;
use jiff_diesel::Timestamp;
use serde::Serialize;

use super::PipelineBuildSummary;
use crate::schema::{pipeline_infos, pipeline_settings};
use crate::types::ChannelCode;

/// Row of `pipeline_infos`.
///
/// The catalog is owned by the pipeline service; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pipeline_infos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineInfo {
    /// Pipeline identifier.
    pub pipeline_id: String,
    /// Owning project.
    pub project_id: String,
    /// Definition version.
    pub version: i32,
    /// Display name.
    pub pipeline_name: String,
    /// Creation channel as upper-case text.
    pub channel: String,
    /// User who created the pipeline.
    pub creator: String,
    /// Whether users may start the pipeline manually.
    pub manual_startup: bool,
    /// Whether elements may be skipped on start.
    pub element_skip: bool,
    /// Number of tasks in the definition.
    pub task_count: i32,
    /// Whether the pipeline was deleted.
    pub deleted: bool,
    /// When the pipeline was created.
    pub created_at: Timestamp,
    /// When the pipeline was last modified.
    pub updated_at: Timestamp,
}

/// Row of `pipeline_settings`.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = pipeline_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineSetting {
    /// Pipeline identifier.
    pub pipeline_id: String,
    /// Free-text description.
    pub description: String,
    /// Concurrency lock mode of the pipeline.
    pub run_lock_type: i32,
}

/// Pipeline catalog entry with its settings and live build summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOverview {
    /// Pipeline identifier.
    pub pipeline_id: String,
    /// Owning project.
    pub project_id: String,
    /// Definition version.
    pub version: i32,
    /// Display name.
    pub pipeline_name: String,
    /// Creation channel, `None` if the stored text is unknown.
    pub channel: Option<ChannelCode>,
    /// User who created the pipeline.
    pub creator: String,
    /// Whether users may start the pipeline manually.
    pub manual_startup: bool,
    /// Whether elements may be skipped on start.
    pub element_skip: bool,
    /// Number of tasks in the definition.
    pub task_count: i32,
    /// When the pipeline was created.
    pub created_at: jiff::Timestamp,
    /// When the pipeline was last modified.
    pub updated_at: jiff::Timestamp,
    /// Free-text description.
    pub description: String,
    /// Concurrency lock mode of the pipeline.
    pub run_lock_type: i32,
    /// Live build summary.
    pub summary: BuildSummary,
}

impl From<(PipelineInfo, PipelineSetting, PipelineBuildSummary)> for PipelineOverview {
    fn from((info, setting, summary): (PipelineInfo, PipelineSetting, PipelineBuildSummary)) -> Self {
        Self {
            channel: ChannelCode::from_stored(&info.channel),
            pipeline_id: info.pipeline_id,
            project_id: info.project_id,
            version: info.version,
            pipeline_name: info.pipeline_name,
            creator: info.creator,
            manual_startup: info.manual_startup,
            element_skip: info.element_skip,
            task_count: info.task_count,
            created_at: info.created_at.into(),
            updated_at: info.updated_at.into(),
            description: setting.description,
            run_lock_type: setting.run_lock_type,
            summary: summary.into(),
        }
    }
}
