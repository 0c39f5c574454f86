//! Creation, deletion and maintenance of summary rows.

use crate::{
    BuildSummary, NewBuildSummary, SummaryCounters, SummaryError, SummaryResult, SummaryStore,
    SummaryUpdate, TRACING_TARGET_LIFECYCLE,
};

/// Manages the existence of a pipeline's summary row.
///
/// A row is created together with its pipeline, before any build is enqueued,
/// and deleted together with it.
#[derive(Debug, Clone)]
pub struct SummaryLifecycle<S> {
    store: S,
}

impl<S: SummaryStore> SummaryLifecycle<S> {
    /// Creates a lifecycle manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the summary row of a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::AlreadyExists`] if the pipeline already has one.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_LIFECYCLE)]
    pub async fn create(
        &self,
        pipeline_id: &str,
        project_id: &str,
        build_no: Option<i32>,
    ) -> SummaryResult<BuildSummary> {
        let new_summary = NewBuildSummary::new(pipeline_id, project_id)
            .with_build_no(build_no.unwrap_or_default());
        let summary = self.store.insert_summary(new_summary).await?;

        tracing::info!(
            target: TRACING_TARGET_LIFECYCLE,
            pipeline_id,
            project_id,
            build_no = summary.build_no,
            "Build summary created"
        );

        Ok(summary)
    }

    /// Deletes the summary row of a pipeline.
    ///
    /// Returns whether a row existed; deleting an absent row is not an error.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_LIFECYCLE)]
    pub async fn delete(&self, pipeline_id: &str) -> SummaryResult<bool> {
        let deleted = self.store.delete_summary(pipeline_id).await?;
        tracing::info!(target: TRACING_TARGET_LIFECYCLE, pipeline_id, deleted, "Build summary deleted");
        Ok(deleted)
    }

    /// Returns the summary of a pipeline.
    pub async fn get(&self, pipeline_id: &str) -> SummaryResult<Option<BuildSummary>> {
        self.store.find_summary(pipeline_id).await
    }

    /// Returns the summaries of a set of pipelines.
    pub async fn get_many(&self, pipeline_ids: &[String]) -> SummaryResult<Vec<BuildSummary>> {
        if pipeline_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.store.find_summaries(pipeline_ids).await
    }

    /// Overwrites the counters with externally computed values.
    ///
    /// This is an out-of-band maintenance pass for counter drift. It never runs
    /// as part of a build lifecycle event and leaves the `latest_*` snapshot alone.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::NotFound`] if the pipeline has no summary.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_LIFECYCLE)]
    pub async fn reconcile(
        &self,
        pipeline_id: &str,
        counters: SummaryCounters,
    ) -> SummaryResult<BuildSummary> {
        let update = SummaryUpdate::new().counters(counters);
        let summary = self
            .store
            .update_summary(pipeline_id, None, update)
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        tracing::warn!(
            target: TRACING_TARGET_LIFECYCLE,
            pipeline_id,
            queue_count = summary.queue_count,
            running_count = summary.running_count,
            finish_count = summary.finish_count,
            "Build summary counters reconciled"
        );

        Ok(summary)
    }
}
