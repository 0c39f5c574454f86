//! [`SummaryStore`] backed by PostgreSQL.

use ci_summary_core::{
    BuildSummary, NewBuildSummary, SummaryError, SummaryResult, SummaryStore, SummaryUpdate,
};

use crate::query::PipelineBuildSummaryRepository;
use crate::{PgClient, TRACING_TARGET_QUERY};

impl SummaryStore for PgClient {
    async fn insert_summary(&self, new_summary: NewBuildSummary) -> SummaryResult<BuildSummary> {
        let pipeline_id = new_summary.pipeline_id.clone();
        let mut conn = self.get_connection().await?;

        let summary = conn
            .create_build_summary(new_summary.into())
            .await
            .map_err(|error| {
                if error.is_unique_violation() {
                    SummaryError::already_exists(&pipeline_id)
                } else {
                    tracing::error!(target: TRACING_TARGET_QUERY, %pipeline_id, %error, "Failed to insert build summary");
                    error.into()
                }
            })?;

        Ok(summary.into())
    }

    async fn delete_summary(&self, pipeline_id: &str) -> SummaryResult<bool> {
        let mut conn = self.get_connection().await?;
        Ok(conn.delete_build_summary(pipeline_id).await?)
    }

    async fn find_summary(&self, pipeline_id: &str) -> SummaryResult<Option<BuildSummary>> {
        let mut conn = self.get_connection().await?;
        let summary = conn.find_build_summary(pipeline_id).await?;
        Ok(summary.map(Into::into))
    }

    async fn find_summaries(&self, pipeline_ids: &[String]) -> SummaryResult<Vec<BuildSummary>> {
        let mut conn = self.get_connection().await?;
        let summaries = conn.find_build_summaries(pipeline_ids).await?;
        Ok(summaries.into_iter().map(Into::into).collect())
    }

    async fn update_summary(
        &self,
        pipeline_id: &str,
        guard: Option<&str>,
        update: SummaryUpdate,
    ) -> SummaryResult<Option<BuildSummary>> {
        let mut conn = self.get_connection().await?;
        let summary = conn
            .update_build_summary(pipeline_id, guard, &update)
            .await
            .map_err(|error| {
                tracing::error!(target: TRACING_TARGET_QUERY, pipeline_id, guard, %error, "Failed to update build summary");
                SummaryError::from(error)
            })?;

        Ok(summary.map(Into::into))
    }
}
