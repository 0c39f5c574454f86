//! Storage contract for build summaries.

use std::future::Future;

use jiff::Timestamp;

use crate::{
    BuildStatus, BuildSummary, NewBuildSummary, SummaryCounters, SummaryError, SummaryResult,
};

/// Change applied to a `build_num` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildNumChange {
    /// `build_num = build_num + 1`, evaluated by the store.
    Increment,
    /// `build_num = value`.
    Set(i32),
}

/// A single-row change evaluated atomically by a [`SummaryStore`].
///
/// Counter deltas are applied by the store as `max(counter + delta, 0)`, never
/// computed client-side. Absolute counters (`counters`) are only used by
/// reconciliation and replace any delta. Every other field is a plain set that
/// is skipped when `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "updates do nothing unless applied by a store"]
pub struct SummaryUpdate {
    /// Delta added to `queue_count`.
    pub queue_delta: i32,
    /// Delta added to `running_count`.
    pub running_delta: i32,
    /// Delta added to `finish_count`.
    pub finish_delta: i32,
    /// Absolute counter values.
    pub counters: Option<SummaryCounters>,
    /// Change to the allocated build number.
    pub build_num: Option<BuildNumChange>,
    /// New display build number.
    pub build_no: Option<i32>,
    /// New latest build.
    pub latest_build_id: Option<String>,
    /// New current task id, `Some(None)` clears it.
    pub latest_task_id: Option<Option<String>>,
    /// New current task name, `Some(None)` clears it.
    pub latest_task_name: Option<Option<String>>,
    /// New task count of the latest build.
    pub latest_task_count: Option<i32>,
    /// New start user of the latest build.
    pub latest_start_user: Option<String>,
    /// New start time of the latest build.
    pub latest_start_time: Option<Timestamp>,
    /// New end time of the latest build.
    pub latest_end_time: Option<Timestamp>,
    /// New status of the latest build.
    pub latest_status: Option<BuildStatus>,
}

impl SummaryUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the queue counter.
    pub fn queue(mut self, delta: i32) -> Self {
        self.queue_delta += delta;
        self
    }

    /// Adds `delta` to the running counter.
    pub fn running(mut self, delta: i32) -> Self {
        self.running_delta += delta;
        self
    }

    /// Adds `delta` to the finish counter.
    pub fn finish(mut self, delta: i32) -> Self {
        self.finish_delta += delta;
        self
    }

    /// Overwrites all three counters and discards pending deltas.
    pub fn counters(mut self, counters: SummaryCounters) -> Self {
        self.queue_delta = 0;
        self.running_delta = 0;
        self.finish_delta = 0;
        self.counters = Some(counters.clamped());
        self
    }

    /// Changes the allocated build number.
    pub fn build_num(mut self, change: BuildNumChange) -> Self {
        self.build_num = Some(change);
        self
    }

    /// Sets the display build number.
    pub fn build_no(mut self, build_no: i32) -> Self {
        self.build_no = Some(build_no);
        self
    }

    /// Makes `build_id` the latest build.
    pub fn latest_build(mut self, build_id: impl Into<String>) -> Self {
        self.latest_build_id = Some(build_id.into());
        self
    }

    /// Sets the task currently executing in the latest build.
    pub fn current_task(mut self, task_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        self.latest_task_id = Some(Some(task_id.into()));
        self.latest_task_name = Some(Some(task_name.into()));
        self
    }

    /// Clears the current task of the latest build to empty text.
    pub fn clear_current_task(mut self) -> Self {
        self.latest_task_id = Some(Some(String::new()));
        self.latest_task_name = Some(Some(String::new()));
        self
    }

    /// Sets the task count of the latest build.
    pub fn task_count(mut self, task_count: i32) -> Self {
        self.latest_task_count = Some(task_count);
        self
    }

    /// Sets the start user of the latest build.
    pub fn start_user(mut self, user_id: impl Into<String>) -> Self {
        self.latest_start_user = Some(user_id.into());
        self
    }

    /// Sets the start time of the latest build.
    pub fn start_time(mut self, at: Timestamp) -> Self {
        self.latest_start_time = Some(at);
        self
    }

    /// Sets the end time of the latest build.
    pub fn end_time(mut self, at: Timestamp) -> Self {
        self.latest_end_time = Some(at);
        self
    }

    /// Sets the status of the latest build.
    pub fn status(mut self, status: BuildStatus) -> Self {
        self.latest_status = Some(status);
        self
    }

    /// Returns whether applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the update to an in-memory row.
    ///
    /// Stores that evaluate updates themselves (e.g. in SQL) must produce the
    /// same result.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::Storage`] and leaves the row untouched if
    /// incrementing `build_num` would overflow.
    pub fn apply_to(&self, row: &mut BuildSummary) -> SummaryResult<()> {
        let build_num = match self.build_num {
            Some(BuildNumChange::Increment) => row.build_num.checked_add(1).ok_or_else(|| {
                SummaryError::storage(format!(
                    "build_num of pipeline '{}' is out of range",
                    row.pipeline_id
                ))
            })?,
            Some(BuildNumChange::Set(value)) => value,
            None => row.build_num,
        };
        row.build_num = build_num;

        match self.counters {
            Some(counters) => {
                row.queue_count = counters.queue_count;
                row.running_count = counters.running_count;
                row.finish_count = counters.finish_count;
            }
            None => {
                row.queue_count = saturating_add(row.queue_count, self.queue_delta);
                row.running_count = saturating_add(row.running_count, self.running_delta);
                row.finish_count = saturating_add(row.finish_count, self.finish_delta);
            }
        }

        if let Some(build_no) = self.build_no {
            row.build_no = build_no;
        }
        if let Some(build_id) = &self.latest_build_id {
            row.latest_build_id = Some(build_id.clone());
        }
        if let Some(task_id) = &self.latest_task_id {
            row.latest_task_id = task_id.clone();
        }
        if let Some(task_name) = &self.latest_task_name {
            row.latest_task_name = task_name.clone();
        }
        if let Some(task_count) = self.latest_task_count {
            row.latest_task_count = Some(task_count);
        }
        if let Some(user) = &self.latest_start_user {
            row.latest_start_user = Some(user.clone());
        }
        if let Some(at) = self.latest_start_time {
            row.latest_start_time = Some(at);
        }
        if let Some(at) = self.latest_end_time {
            row.latest_end_time = Some(at);
        }
        if let Some(status) = self.latest_status {
            row.latest_status = Some(status);
        }

        Ok(())
    }
}

/// Counter arithmetic shared with SQL stores: `max(counter + delta, 0)`.
#[inline]
fn saturating_add(counter: i32, delta: i32) -> i32 {
    counter.saturating_add(delta).max(0)
}

/// Durable keyed store of build summaries, one row per pipeline.
///
/// Every mutation goes through [`update_summary`], which the store must apply as
/// one atomic single-row statement. No caller reads a row, modifies it and
/// writes it back.
///
/// [`update_summary`]: SummaryStore::update_summary
pub trait SummaryStore: Send + Sync {
    /// Inserts a new summary row with all counters at zero.
    ///
    /// Fails with [`SummaryError::AlreadyExists`] if the pipeline has one.
    ///
    /// [`SummaryError::AlreadyExists`]: crate::SummaryError::AlreadyExists
    fn insert_summary(
        &self,
        new_summary: NewBuildSummary,
    ) -> impl Future<Output = SummaryResult<BuildSummary>> + Send;

    /// Deletes the summary row, returning whether one existed.
    fn delete_summary(&self, pipeline_id: &str) -> impl Future<Output = SummaryResult<bool>> + Send;

    /// Finds the summary row of a pipeline.
    fn find_summary(
        &self,
        pipeline_id: &str,
    ) -> impl Future<Output = SummaryResult<Option<BuildSummary>>> + Send;

    /// Finds the summary rows of a set of pipelines, skipping unknown ids.
    ///
    /// Each row appears once, ordered by pipeline id.
    fn find_summaries(
        &self,
        pipeline_ids: &[String],
    ) -> impl Future<Output = SummaryResult<Vec<BuildSummary>>> + Send;

    /// Atomically applies `update` to the row of `pipeline_id`.
    ///
    /// With `guard = Some(build_id)` the row must additionally have
    /// `latest_build_id == build_id`. Returns the updated row when exactly one
    /// row matched and `None` when none did.
    fn update_summary(
        &self,
        pipeline_id: &str,
        guard: Option<&str>,
        update: SummaryUpdate,
    ) -> impl Future<Output = SummaryResult<Option<BuildSummary>>> + Send;
}
