//! Diesel models of the summary store tables.

mod pipeline_build_summary;
mod pipeline_overview;

pub use pipeline_build_summary::{
    NewPipelineBuildSummary, PipelineBuildSummary, UpdatePipelineBuildSummary,
};
pub use pipeline_overview::{PipelineInfo, PipelineOverview, PipelineSetting};
