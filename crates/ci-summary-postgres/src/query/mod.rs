//! Repository traits implemented on [`PgConnection`].
//!
//! [`PgConnection`]: crate::PgConnection

mod pipeline_build_summary;
mod pipeline_overview;

pub use pipeline_build_summary::PipelineBuildSummaryRepository;
pub use pipeline_overview::PipelineOverviewRepository;
