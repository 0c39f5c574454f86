//! Pipeline overview listing.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{PipelineBuildSummary, PipelineInfo, PipelineOverview, PipelineSetting};
use crate::types::{OffsetPage, OffsetPagination, OverviewFilter};
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Builds the boxed catalog join restricted by an [`OverviewFilter`].
macro_rules! filtered_overviews {
    ($filter:expr) => {{
        use schema::{pipeline_build_summaries, pipeline_infos, pipeline_settings};

        let filter: &OverviewFilter = $filter;
        let mut query = pipeline_infos::table
            .inner_join(pipeline_settings::table)
            .inner_join(pipeline_build_summaries::table)
            .filter(pipeline_infos::deleted.eq(filter.deleted))
            .into_boxed();

        if !filter.project_ids.is_empty() {
            query = query.filter(pipeline_infos::project_id.eq_any(&filter.project_ids));
        }
        if !filter.channels.is_empty() {
            query = query.filter(pipeline_infos::channel.eq_any(filter.channel_codes()));
        }
        if !filter.pipeline_ids.is_empty() {
            query = query.filter(pipeline_infos::pipeline_id.eq_any(&filter.pipeline_ids));
        }

        query
    }};
}

/// Repository for the pipeline catalog joined with build summaries.
///
/// Pipelines without a settings row or a summary row are not listed.
pub trait PipelineOverviewRepository {
    /// Lists one page of overviews, newest pipelines first.
    fn list_pipeline_overviews(
        &mut self,
        filter: &OverviewFilter,
        pagination: OffsetPagination,
    ) -> impl Future<Output = PgResult<OffsetPage<PipelineOverview>>> + Send;

    /// Lists every matching overview, newest pipelines first.
    fn list_all_pipeline_overviews(
        &mut self,
        filter: &OverviewFilter,
    ) -> impl Future<Output = PgResult<Vec<PipelineOverview>>> + Send;
}

impl PipelineOverviewRepository for PgConnection {
    async fn list_pipeline_overviews(
        &mut self,
        filter: &OverviewFilter,
        pagination: OffsetPagination,
    ) -> PgResult<OffsetPage<PipelineOverview>> {
        use schema::pipeline_infos;

        let total = if pagination.include_count {
            Some(
                filtered_overviews!(filter)
                    .count()
                    .get_result::<i64>(self)
                    .await
                    .map_err(PgError::from)?,
            )
        } else {
            None
        };

        let rows: Vec<(PipelineInfo, PipelineSetting, PipelineBuildSummary)> =
            filtered_overviews!(filter)
                .select((
                    PipelineInfo::as_select(),
                    PipelineSetting::as_select(),
                    PipelineBuildSummary::as_select(),
                ))
                .order((pipeline_infos::created_at.desc(), pipeline_infos::pipeline_id.asc()))
                .limit(pagination.limit)
                .offset(pagination.offset)
                .load(self)
                .await
                .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            rows = rows.len(),
            total,
            limit = pagination.limit,
            offset = pagination.offset,
            "Listed pipeline overviews"
        );

        Ok(OffsetPage::new(rows, total).map(PipelineOverview::from))
    }

    async fn list_all_pipeline_overviews(
        &mut self,
        filter: &OverviewFilter,
    ) -> PgResult<Vec<PipelineOverview>> {
        use schema::pipeline_infos;

        let rows: Vec<(PipelineInfo, PipelineSetting, PipelineBuildSummary)> =
            filtered_overviews!(filter)
                .select((
                    PipelineInfo::as_select(),
                    PipelineSetting::as_select(),
                    PipelineBuildSummary::as_select(),
                ))
                .order((pipeline_infos::created_at.desc(), pipeline_infos::pipeline_id.asc()))
                .load(self)
                .await
                .map_err(PgError::from)?;

        Ok(rows.into_iter().map(PipelineOverview::from).collect())
    }
}
