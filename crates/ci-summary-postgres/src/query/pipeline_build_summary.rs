//! Build summary repository.
//!
//! Every write is a single statement. Counter changes are computed by the
//! database from the current row, so concurrent lifecycle events for the same
//! pipeline never overwrite each other's increments.

use std::future::Future;

use ci_summary_core::{BuildNumChange, SummaryUpdate};
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_async::RunQueryDsl;

use crate::model::{NewPipelineBuildSummary, PipelineBuildSummary, UpdatePipelineBuildSummary};
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

diesel::define_sql_function! {
    /// SQL `GREATEST` over two integers.
    fn greatest(a: Integer, b: Integer) -> Integer;
}

/// Repository for `pipeline_build_summaries`.
pub trait PipelineBuildSummaryRepository {
    /// Inserts a summary row with zeroed counters.
    fn create_build_summary(
        &mut self,
        new_summary: NewPipelineBuildSummary,
    ) -> impl Future<Output = PgResult<PipelineBuildSummary>> + Send;

    /// Deletes a summary row, returning whether one existed.
    fn delete_build_summary(&mut self, pipeline_id: &str)
    -> impl Future<Output = PgResult<bool>> + Send;

    /// Finds the summary row of a pipeline.
    fn find_build_summary(
        &mut self,
        pipeline_id: &str,
    ) -> impl Future<Output = PgResult<Option<PipelineBuildSummary>>> + Send;

    /// Finds the summary rows of a set of pipelines, skipping unknown ids.
    fn find_build_summaries(
        &mut self,
        pipeline_ids: &[String],
    ) -> impl Future<Output = PgResult<Vec<PipelineBuildSummary>>> + Send;

    /// Applies `update` in one `UPDATE ... RETURNING` statement.
    ///
    /// With `guard = Some(build_id)` the row must also have
    /// `latest_build_id = build_id`. Returns `None` when no row matched.
    fn update_build_summary(
        &mut self,
        pipeline_id: &str,
        guard: Option<&str>,
        update: &SummaryUpdate,
    ) -> impl Future<Output = PgResult<Option<PipelineBuildSummary>>> + Send;
}

impl PipelineBuildSummaryRepository for PgConnection {
    async fn create_build_summary(
        &mut self,
        new_summary: NewPipelineBuildSummary,
    ) -> PgResult<PipelineBuildSummary> {
        use schema::pipeline_build_summaries;

        let summary = diesel::insert_into(pipeline_build_summaries::table)
            .values(&new_summary)
            .returning(PipelineBuildSummary::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(summary)
    }

    async fn delete_build_summary(&mut self, pipeline_id: &str) -> PgResult<bool> {
        use schema::pipeline_build_summaries::{self, dsl};

        let deleted = diesel::delete(pipeline_build_summaries::table)
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(deleted > 0)
    }

    async fn find_build_summary(
        &mut self,
        pipeline_id: &str,
    ) -> PgResult<Option<PipelineBuildSummary>> {
        use schema::pipeline_build_summaries::{self, dsl};

        let summary = pipeline_build_summaries::table
            .filter(dsl::pipeline_id.eq(pipeline_id))
            .select(PipelineBuildSummary::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(summary)
    }

    async fn find_build_summaries(
        &mut self,
        pipeline_ids: &[String],
    ) -> PgResult<Vec<PipelineBuildSummary>> {
        use schema::pipeline_build_summaries::{self, dsl};

        if pipeline_ids.is_empty() {
            return Ok(Vec::new());
        }

        let summaries = pipeline_build_summaries::table
            .filter(dsl::pipeline_id.eq_any(pipeline_ids))
            .order(dsl::pipeline_id.asc())
            .select(PipelineBuildSummary::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(summaries)
    }

    async fn update_build_summary(
        &mut self,
        pipeline_id: &str,
        guard: Option<&str>,
        update: &SummaryUpdate,
    ) -> PgResult<Option<PipelineBuildSummary>> {
        use schema::pipeline_build_summaries::{self, dsl};

        if update.is_empty() {
            tracing::trace!(target: TRACING_TARGET_QUERY, pipeline_id, "Empty summary update");
            let mut query = pipeline_build_summaries::table
                .filter(dsl::pipeline_id.eq(pipeline_id))
                .into_boxed();
            if let Some(build_id) = guard {
                query = query.filter(dsl::latest_build_id.eq(build_id));
            }

            return query
                .select(PipelineBuildSummary::as_select())
                .first(self)
                .await
                .optional()
                .map_err(PgError::from);
        }

        // Absolute counters replace the deltas; both on one column would be
        // rejected as a duplicate assignment.
        let use_deltas = update.counters.is_none();
        let queue = (use_deltas && update.queue_delta != 0)
            .then(|| dsl::queue_count.eq(greatest(dsl::queue_count + update.queue_delta, 0)));
        let running = (use_deltas && update.running_delta != 0).then(|| {
            dsl::running_count.eq(greatest(dsl::running_count + update.running_delta, 0))
        });
        let finish = (use_deltas && update.finish_delta != 0)
            .then(|| dsl::finish_count.eq(greatest(dsl::finish_count + update.finish_delta, 0)));
        let counters = update.counters.map(|counters| {
            (
                dsl::queue_count.eq(counters.queue_count),
                dsl::running_count.eq(counters.running_count),
                dsl::finish_count.eq(counters.finish_count),
            )
        });
        let build_num_increment = matches!(update.build_num, Some(BuildNumChange::Increment))
            .then(|| dsl::build_num.eq(dsl::build_num + 1));
        let build_num_set = match update.build_num {
            Some(BuildNumChange::Set(value)) => Some(dsl::build_num.eq(value)),
            _ => None,
        };
        let columns = UpdatePipelineBuildSummary::from(update);
        let columns = (!columns.is_empty()).then_some(columns);

        let changes = (
            queue,
            running,
            finish,
            counters,
            build_num_increment,
            build_num_set,
            columns,
        );

        let summary = match guard {
            Some(build_id) => {
                diesel::update(pipeline_build_summaries::table)
                    .filter(dsl::pipeline_id.eq(pipeline_id))
                    .filter(dsl::latest_build_id.eq(build_id))
                    .set(changes)
                    .returning(PipelineBuildSummary::as_returning())
                    .get_result(self)
                    .await
            }
            None => {
                diesel::update(pipeline_build_summaries::table)
                    .filter(dsl::pipeline_id.eq(pipeline_id))
                    .set(changes)
                    .returning(PipelineBuildSummary::as_returning())
                    .get_result(self)
                    .await
            }
        }
        .optional()
        .map_err(PgError::from)?;

        if summary.is_none() {
            tracing::debug!(
                target: TRACING_TARGET_QUERY,
                pipeline_id,
                guard,
                "Summary update matched no row"
            );
        }

        Ok(summary)
    }
}
