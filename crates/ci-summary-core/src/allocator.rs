//! Per-pipeline build number allocation.

use crate::{
    BuildNumChange, SummaryError, SummaryResult, SummaryStore, SummaryUpdate,
    TRACING_TARGET_ALLOCATOR,
};

/// Allocates build numbers and manages the display build number.
///
/// Allocation is a single store-evaluated `build_num = build_num + 1`; the
/// returned number is the one the store reports for that same statement, so
/// concurrent allocations on one pipeline never observe each other's value.
#[derive(Debug, Clone)]
pub struct BuildNumberAllocator<S> {
    store: S,
}

impl<S: SummaryStore> BuildNumberAllocator<S> {
    /// Creates an allocator over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Allocates the next build number of a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::NotFound`] if the pipeline has no summary.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_ALLOCATOR)]
    pub async fn allocate(&self, pipeline_id: &str) -> SummaryResult<i32> {
        let update = SummaryUpdate::new().build_num(BuildNumChange::Increment);
        let build_num = self.apply(pipeline_id, update).await?;

        tracing::debug!(target: TRACING_TARGET_ALLOCATOR, pipeline_id, build_num, "Build number allocated");
        Ok(build_num)
    }

    /// Sets the build number counter of a pipeline verbatim.
    ///
    /// The next [`allocate`] returns `build_num + 1`.
    ///
    /// [`allocate`]: Self::allocate
    #[tracing::instrument(skip(self), target = TRACING_TARGET_ALLOCATOR)]
    pub async fn override_build_num(&self, pipeline_id: &str, build_num: i32) -> SummaryResult<i32> {
        let update = SummaryUpdate::new().build_num(BuildNumChange::Set(build_num));
        let build_num = self.apply(pipeline_id, update).await?;

        tracing::info!(target: TRACING_TARGET_ALLOCATOR, pipeline_id, build_num, "Build number overridden");
        Ok(build_num)
    }

    /// Returns the display build number of a pipeline.
    pub async fn build_no(&self, pipeline_id: &str) -> SummaryResult<i32> {
        let summary = self
            .store
            .find_summary(pipeline_id)
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        Ok(summary.build_no)
    }

    /// Sets the display build number of a pipeline.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_ALLOCATOR)]
    pub async fn set_build_no(&self, pipeline_id: &str, build_no: i32) -> SummaryResult<()> {
        self.store
            .update_summary(pipeline_id, None, SummaryUpdate::new().build_no(build_no))
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        Ok(())
    }

    async fn apply(&self, pipeline_id: &str, update: SummaryUpdate) -> SummaryResult<i32> {
        let summary = self
            .store
            .update_summary(pipeline_id, None, update)
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        Ok(summary.build_num)
    }
}
