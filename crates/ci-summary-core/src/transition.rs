//! Build lifecycle transitions over a pipeline's summary row.
//!
//! Every operation is one or two atomic store updates. Counters move by deltas
//! that are safe in any order; `latest_*` fields are only written when the row's
//! `latest_build_id` still names the reporting build, except in `start`, which
//! makes the reporting build the latest one.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    BuildStatus, SummaryError, SummaryResult, SummaryStore, SummaryUpdate,
    TRACING_TARGET_TRANSITION,
};

/// Outcome of a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// The update was applied to the summary.
    Applied,
    /// The build was not the latest one; only its counters were adjusted.
    Compensated,
    /// The build was not the latest one; nothing changed.
    Stale,
}

impl Transition {
    /// Returns whether the `latest_*` snapshot was written.
    #[inline]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Applies build lifecycle events to pipeline summaries.
///
/// The engine holds no locks between calls. Concurrent events for different
/// builds of one pipeline are made safe by store-evaluated deltas and by the
/// `latest_build_id` guard.
#[derive(Debug, Clone)]
pub struct TransitionEngine<S> {
    store: S,
}

impl<S: SummaryStore> TransitionEngine<S> {
    /// Creates an engine over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records `increment` builds entering the queue.
    ///
    /// A negative increment pulls builds back out of the queue.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_TRANSITION)]
    pub async fn enqueue(&self, pipeline_id: &str, increment: i32) -> SummaryResult<Transition> {
        let update = SummaryUpdate::new().queue(increment);
        let summary = self
            .store
            .update_summary(pipeline_id, None, update)
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        tracing::debug!(
            target: TRACING_TARGET_TRANSITION,
            pipeline_id,
            queue_count = summary.queue_count,
            "Build enqueued"
        );

        Ok(Transition::Applied)
    }

    /// Records a queued build starting and makes it the latest build.
    ///
    /// The snapshot, the queue/running counters and the `Running` status are
    /// written in one statement, so a newer build starting concurrently either
    /// lands entirely before or entirely after this one.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_TRANSITION)]
    pub async fn start(
        &self,
        pipeline_id: &str,
        build_id: &str,
        user_id: &str,
        task_count: i32,
    ) -> SummaryResult<Transition> {
        let update = SummaryUpdate::new()
            .latest_build(build_id)
            .task_count(task_count)
            .start_user(user_id)
            .start_time(Timestamp::now())
            .status(BuildStatus::Running)
            .queue(-1)
            .running(1);

        let summary = self
            .store
            .update_summary(pipeline_id, None, update)
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        tracing::info!(
            target: TRACING_TARGET_TRANSITION,
            pipeline_id,
            build_id,
            queue_count = summary.queue_count,
            running_count = summary.running_count,
            "Build started"
        );

        Ok(Transition::Applied)
    }

    /// Records the task currently executing in a build.
    ///
    /// Task progress of a build that is no longer the latest is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::NotFound`] if the pipeline has no summary.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_TRANSITION)]
    pub async fn update_current_task(
        &self,
        pipeline_id: &str,
        build_id: &str,
        task_id: &str,
        task_name: &str,
    ) -> SummaryResult<Transition> {
        let update = SummaryUpdate::new().current_task(task_id, task_name);
        let updated = self
            .store
            .update_summary(pipeline_id, Some(build_id), update)
            .await?;

        if updated.is_none() {
            self.ensure_exists(pipeline_id).await?;
            tracing::debug!(
                target: TRACING_TARGET_TRANSITION,
                pipeline_id,
                build_id,
                "Task update from a superseded build ignored"
            );
            return Ok(Transition::Stale);
        }

        Ok(Transition::Applied)
    }

    /// Records a build reaching a terminal status.
    ///
    /// When the build is still the latest one its status and end time are
    /// written and its current task is cleared. Otherwise a newer build owns the
    /// snapshot and only `running_count - 1, finish_count + 1` is applied.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::NotFound`] if the pipeline has no summary.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_TRANSITION)]
    pub async fn finish(
        &self,
        pipeline_id: &str,
        build_id: &str,
        status: BuildStatus,
    ) -> SummaryResult<Transition> {
        let update = SummaryUpdate::new()
            .status(status)
            .end_time(Timestamp::now())
            .clear_current_task()
            .running(-1)
            .finish(1);

        let latest = self
            .store
            .update_summary(pipeline_id, Some(build_id), update)
            .await?;

        if let Some(summary) = latest {
            tracing::info!(
                target: TRACING_TARGET_TRANSITION,
                pipeline_id,
                build_id,
                %status,
                running_count = summary.running_count,
                finish_count = summary.finish_count,
                "Build finished"
            );
            return Ok(Transition::Applied);
        }

        let compensation = SummaryUpdate::new().running(-1).finish(1);
        let summary = self
            .store
            .update_summary(pipeline_id, None, compensation)
            .await?
            .ok_or_else(|| SummaryError::not_found(pipeline_id))?;

        tracing::info!(
            target: TRACING_TARGET_TRANSITION,
            pipeline_id,
            build_id,
            %status,
            latest_build_id = summary.latest_build_id.as_deref(),
            running_count = summary.running_count,
            finish_count = summary.finish_count,
            "Superseded build finished, counters compensated"
        );

        Ok(Transition::Compensated)
    }

    /// Adjusts the running count for stage-level parallelism of the latest build.
    ///
    /// Applied only while the build is the latest one. On success the end time
    /// is refreshed and the status becomes `Running` for a positive delta or
    /// `StageSuccess` otherwise.
    ///
    /// The status shares its field with [`finish`]; callers that may report both
    /// for one build concurrently must serialize them, the last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`SummaryError::NotFound`] if the pipeline has no summary.
    ///
    /// [`finish`]: Self::finish
    #[tracing::instrument(skip(self), target = TRACING_TARGET_TRANSITION)]
    pub async fn adjust_running_count(
        &self,
        pipeline_id: &str,
        build_id: &str,
        delta: i32,
    ) -> SummaryResult<Transition> {
        let status = if delta > 0 {
            BuildStatus::Running
        } else {
            BuildStatus::StageSuccess
        };

        let update = SummaryUpdate::new()
            .running(delta)
            .end_time(Timestamp::now())
            .status(status);

        let updated = self
            .store
            .update_summary(pipeline_id, Some(build_id), update)
            .await?;

        let Some(summary) = updated else {
            self.ensure_exists(pipeline_id).await?;
            tracing::debug!(
                target: TRACING_TARGET_TRANSITION,
                pipeline_id,
                build_id,
                delta,
                "Running count change from a superseded build ignored"
            );
            return Ok(Transition::Stale);
        };

        tracing::debug!(
            target: TRACING_TARGET_TRANSITION,
            pipeline_id,
            build_id,
            delta,
            running_count = summary.running_count,
            "Running count adjusted"
        );

        Ok(Transition::Applied)
    }

    /// Tells a missing summary apart from a guard that named a superseded build.
    async fn ensure_exists(&self, pipeline_id: &str) -> SummaryResult<()> {
        match self.store.find_summary(pipeline_id).await? {
            Some(_) => Ok(()),
            None => Err(SummaryError::not_found(pipeline_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{BuildSummary, MemorySummaryStore, NewBuildSummary, SummaryCounters};

    async fn engine_with(counters: SummaryCounters) -> TransitionEngine<MemorySummaryStore> {
        let store = MemorySummaryStore::new();
        store
            .insert_summary(NewBuildSummary::new("p", "proj"))
            .await
            .unwrap();
        store
            .update_summary("p", None, SummaryUpdate::new().counters(counters))
            .await
            .unwrap();
        TransitionEngine::new(store)
    }

    async fn summary(engine: &TransitionEngine<MemorySummaryStore>) -> BuildSummary {
        engine.store().find_summary("p").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn start_then_finish_latest_build() {
        let engine = engine_with(SummaryCounters::new(2, 0, 5)).await;

        let outcome = engine.start("p", "b100", "u1", 3).await.unwrap();
        assert_eq!(outcome, Transition::Applied);

        let started = summary(&engine).await;
        assert_eq!(started.counters(), SummaryCounters::new(1, 1, 5));
        assert_eq!(started.latest_build_id.as_deref(), Some("b100"));
        assert_eq!(started.latest_status, Some(BuildStatus::Running));
        assert_eq!(started.latest_start_user.as_deref(), Some("u1"));
        assert_eq!(started.latest_task_count, Some(3));
        assert!(started.latest_start_time.is_some());

        engine
            .update_current_task("p", "b100", "t-1", "checkout")
            .await
            .unwrap();

        let outcome = engine
            .finish("p", "b100", BuildStatus::Succeed)
            .await
            .unwrap();
        assert_eq!(outcome, Transition::Applied);

        let finished = summary(&engine).await;
        assert_eq!(finished.counters(), SummaryCounters::new(1, 0, 6));
        assert_eq!(finished.latest_status, Some(BuildStatus::Succeed));
        assert_eq!(finished.latest_task_id.as_deref(), Some(""));
        assert_eq!(finished.latest_task_name.as_deref(), Some(""));
        assert!(finished.latest_end_time.is_some());
    }

    #[tokio::test]
    async fn out_of_order_finish_is_compensated() {
        let engine = engine_with(SummaryCounters::new(2, 0, 0)).await;
        engine.start("p", "b1", "u1", 1).await.unwrap();
        engine.start("p", "b2", "u2", 4).await.unwrap();
        engine
            .update_current_task("p", "b2", "t-7", "deploy")
            .await
            .unwrap();

        let outcome = engine.finish("p", "b1", BuildStatus::Succeed).await.unwrap();
        assert_eq!(outcome, Transition::Compensated);

        let after = summary(&engine).await;
        assert_eq!(after.counters(), SummaryCounters::new(0, 1, 1));
        assert_eq!(after.latest_build_id.as_deref(), Some("b2"));
        assert_eq!(after.latest_status, Some(BuildStatus::Running));
        assert_eq!(after.latest_start_user.as_deref(), Some("u2"));
        assert_eq!(after.latest_task_id.as_deref(), Some("t-7"));
        assert_eq!(after.latest_end_time, None);
    }

    #[tokio::test]
    async fn task_update_from_superseded_build_is_ignored() {
        let engine = engine_with(SummaryCounters::new(2, 0, 0)).await;
        engine.start("p", "b1", "u1", 1).await.unwrap();
        engine.start("p", "b2", "u1", 1).await.unwrap();
        let before = summary(&engine).await;

        let outcome = engine
            .update_current_task("p", "b1", "t-1", "build")
            .await
            .unwrap();
        assert_eq!(outcome, Transition::Stale);
        assert_eq!(summary(&engine).await, before);
    }

    #[tokio::test]
    async fn enqueue_counts_and_pulls_back() {
        let engine = engine_with(SummaryCounters::default()).await;
        engine.enqueue("p", 1).await.unwrap();
        engine.enqueue("p", 2).await.unwrap();
        engine.enqueue("p", -1).await.unwrap();
        assert_eq!(summary(&engine).await.queue_count, 2);
    }

    #[tokio::test]
    async fn missing_pipeline_is_not_found() {
        let engine = engine_with(SummaryCounters::default()).await;
        assert!(engine.enqueue("x", 1).await.unwrap_err().is_not_found());
        assert!(engine.start("x", "b", "u", 1).await.unwrap_err().is_not_found());
        assert!(
            engine
                .finish("x", "b", BuildStatus::Failed)
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            engine
                .update_current_task("x", "b", "t", "n")
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            engine
                .adjust_running_count("x", "b", 1)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn superseded_guarded_events_are_stale() {
        let engine = engine_with(SummaryCounters::new(2, 0, 0)).await;
        engine.start("p", "b1", "u1", 1).await.unwrap();
        engine.start("p", "b2", "u2", 1).await.unwrap();

        assert_eq!(
            engine.update_current_task("p", "b1", "t", "n").await.unwrap(),
            Transition::Stale
        );
        assert_eq!(
            engine.adjust_running_count("p", "b1", 1).await.unwrap(),
            Transition::Stale
        );
        assert_eq!(summary(&engine).await.running_count, 2);
    }

    #[tokio::test]
    async fn running_count_adjustments() {
        let engine = engine_with(SummaryCounters::new(1, 0, 0)).await;
        engine.start("p", "b1", "u1", 2).await.unwrap();

        let outcome = engine.adjust_running_count("p", "b1", 2).await.unwrap();
        assert_eq!(outcome, Transition::Applied);
        let after = summary(&engine).await;
        assert_eq!(after.running_count, 3);
        assert_eq!(after.latest_status, Some(BuildStatus::Running));
        assert!(after.latest_end_time.is_some());

        engine.adjust_running_count("p", "b1", -2).await.unwrap();
        let after = summary(&engine).await;
        assert_eq!(after.running_count, 1);
        assert_eq!(after.latest_status, Some(BuildStatus::StageSuccess));

        let stale = engine.adjust_running_count("p", "b0", 1).await.unwrap();
        assert_eq!(stale, Transition::Stale);
        assert_eq!(summary(&engine).await.running_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_builds_settle_counters() {
        const BUILDS: i32 = 32;

        let engine = engine_with(SummaryCounters::default()).await;
        engine.enqueue("p", BUILDS).await.unwrap();

        let tasks: Vec<_> = (0..BUILDS)
            .map(|n| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let build_id = format!("b{n}");
                    engine.start("p", &build_id, "u", 1).await.unwrap();
                    tokio::task::yield_now().await;
                    engine
                        .update_current_task("p", &build_id, "t", "task")
                        .await
                        .unwrap();
                    engine
                        .finish("p", &build_id, BuildStatus::Succeed)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut applied = 0;
        for task in tasks {
            if task.await.unwrap().is_applied() {
                applied += 1;
            }
        }

        let after = summary(&engine).await;
        assert_eq!(after.counters(), SummaryCounters::new(0, 0, BUILDS));
        assert!(applied >= 1);
        assert!(after.latest_build_id.is_some());
    }

    #[derive(Debug, Clone)]
    enum Event {
        Enqueue(i32),
        Start(u8),
        Task(u8),
        Finish(u8),
        Adjust(u8, i32),
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (-2..4i32).prop_map(Event::Enqueue),
            (0..4u8).prop_map(Event::Start),
            (0..4u8).prop_map(Event::Task),
            (0..4u8).prop_map(Event::Finish),
            ((0..4u8), (-2..3i32)).prop_map(|(b, d)| Event::Adjust(b, d)),
        ]
    }

    proptest! {
        #[test]
        fn counters_stay_non_negative_and_finish_is_monotonic(
            events in proptest::collection::vec(event(), 0..64)
        ) {
            futures::executor::block_on(async {
                let engine = engine_with(SummaryCounters::default()).await;
                let mut last_finish = 0;

                for event in events {
                    match event {
                        Event::Enqueue(n) => { engine.enqueue("p", n).await.unwrap(); }
                        Event::Start(b) => { engine.start("p", &format!("b{b}"), "u", 1).await.unwrap(); }
                        Event::Task(b) => { engine.update_current_task("p", &format!("b{b}"), "t", "n").await.unwrap(); }
                        Event::Finish(b) => { engine.finish("p", &format!("b{b}"), BuildStatus::Failed).await.unwrap(); }
                        Event::Adjust(b, d) => { engine.adjust_running_count("p", &format!("b{b}"), d).await.unwrap(); }
                    }

                    let now = summary(&engine).await;
                    prop_assert!(now.queue_count >= 0);
                    prop_assert!(now.running_count >= 0);
                    prop_assert!(now.finish_count >= last_finish);
                    last_finish = now.finish_count;
                }

                Ok::<(), TestCaseError>(())
            })?;
        }

        #[test]
        fn finish_increments_finish_count_exactly_once(
            starts in proptest::collection::vec(0..6u8, 1..8),
            finished in 0..6u8,
        ) {
            futures::executor::block_on(async {
                let engine = engine_with(SummaryCounters::new(starts.len() as i32, 0, 0)).await;
                for b in &starts {
                    engine.start("p", &format!("b{b}"), "u", 1).await.unwrap();
                }

                let before = summary(&engine).await;
                let outcome = engine
                    .finish("p", &format!("b{finished}"), BuildStatus::Succeed)
                    .await
                    .unwrap();
                let after = summary(&engine).await;

                prop_assert_eq!(after.finish_count, before.finish_count + 1);
                prop_assert_eq!(after.running_count, (before.running_count - 1).max(0));
                if outcome == Transition::Compensated {
                    prop_assert_eq!(&after.latest_build_id, &before.latest_build_id);
                    prop_assert_eq!(after.latest_status, before.latest_status);
                    prop_assert_eq!(&after.latest_task_id, &before.latest_task_id);
                }

                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
