//! Summary store tests against a live database.
//!
//! Run with `POSTGRES_URL=... cargo test -p ci-summary-postgres -- --ignored`.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use ci_summary_core::{
    BuildNumberAllocator, BuildStatus, SummaryCounters, SummaryError, SummaryLifecycle,
    SummaryStore, SummaryUpdate, Transition, TransitionEngine,
};
use ci_summary_postgres::query::{PipelineBuildSummaryRepository, PipelineOverviewRepository};
use ci_summary_postgres::types::{ChannelCode, OffsetPagination, OverviewFilter};
use ci_summary_postgres::{PgClient, PgClientMigrationExt, PgConfig};
use diesel_async::RunQueryDsl;

async fn client() -> PgClient {
    let url = std::env::var("POSTGRES_URL").expect("POSTGRES_URL must be set");
    let client = PgClient::new_with_test(PgConfig::new(url).with_max_connections(16))
        .await
        .unwrap();
    client.run_pending_migrations().await.unwrap();
    client
}

fn unique_id(prefix: &str) -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{n}", jiff::Timestamp::now().as_nanosecond())
}

async fn create(client: &PgClient, queue: i32, running: i32, finish: i32) -> String {
    let pipeline_id = unique_id("pipeline");
    let lifecycle = SummaryLifecycle::new(client.clone());
    lifecycle.create(&pipeline_id, "it-project", None).await.unwrap();
    lifecycle
        .reconcile(&pipeline_id, SummaryCounters::new(queue, running, finish))
        .await
        .unwrap();
    pipeline_id
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn migrations_are_idempotent() {
    let client = client().await;
    let result = client.run_pending_migrations().await.unwrap();
    assert!(result.is_no_op());
    client.verify_schema_integrity().await.unwrap();
    assert!(client.get_migration_status().await.unwrap().is_up_to_date());
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn create_twice_is_already_exists() {
    let client = client().await;
    let pipeline_id = create(&client, 0, 0, 0).await;

    let error = SummaryLifecycle::new(client.clone())
        .create(&pipeline_id, "it-project", None)
        .await
        .unwrap_err();
    assert!(matches!(error, SummaryError::AlreadyExists { .. }));
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn start_then_finish() {
    let client = client().await;
    let pipeline_id = create(&client, 2, 0, 5).await;
    let engine = TransitionEngine::new(client.clone());

    engine.start(&pipeline_id, "b-1", "alice", 4).await.unwrap();
    let summary = client.find_summary(&pipeline_id).await.unwrap().unwrap();
    assert_eq!(summary.counters(), SummaryCounters::new(1, 1, 5));
    assert_eq!(summary.latest_status, Some(BuildStatus::Running));
    assert_eq!(summary.latest_task_count, Some(4));

    engine
        .update_current_task(&pipeline_id, "b-1", "t-1", "compile")
        .await
        .unwrap();
    let outcome = engine
        .finish(&pipeline_id, "b-1", BuildStatus::Succeed)
        .await
        .unwrap();
    assert_eq!(outcome, Transition::Applied);

    let summary = client.find_summary(&pipeline_id).await.unwrap().unwrap();
    assert_eq!(summary.counters(), SummaryCounters::new(1, 0, 6));
    assert_eq!(summary.latest_status, Some(BuildStatus::Succeed));
    assert_eq!(summary.latest_task_id.as_deref(), Some(""));
    assert_eq!(summary.latest_task_name.as_deref(), Some(""));
    assert!(summary.latest_end_time.is_some());
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn superseded_finish_is_compensated() {
    let client = client().await;
    let pipeline_id = create(&client, 2, 0, 0).await;
    let engine = TransitionEngine::new(client.clone());

    engine.start(&pipeline_id, "b-1", "alice", 1).await.unwrap();
    engine.start(&pipeline_id, "b-2", "bob", 1).await.unwrap();

    let stale = engine
        .update_current_task(&pipeline_id, "b-1", "t-1", "compile")
        .await
        .unwrap();
    assert_eq!(stale, Transition::Stale);

    let outcome = engine
        .finish(&pipeline_id, "b-1", BuildStatus::Failed)
        .await
        .unwrap();
    assert_eq!(outcome, Transition::Compensated);

    let summary = client.find_summary(&pipeline_id).await.unwrap().unwrap();
    assert_eq!(summary.counters(), SummaryCounters::new(0, 1, 1));
    assert_eq!(summary.latest_build_id.as_deref(), Some("b-2"));
    assert_eq!(summary.latest_status, Some(BuildStatus::Running));
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn counters_never_go_negative() {
    let client = client().await;
    let pipeline_id = create(&client, 0, 0, 0).await;

    let summary = client
        .update_summary(&pipeline_id, None, SummaryUpdate::new().queue(-3).running(-1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.counters(), SummaryCounters::default());
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn missing_rows() {
    let client = client().await;
    let engine = TransitionEngine::new(client.clone());

    assert!(engine.enqueue("missing", 1).await.unwrap_err().is_not_found());
    assert!(
        engine
            .adjust_running_count("missing", "b-1", 1)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        engine
            .update_current_task("missing", "b-1", "t-1", "compile")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(client.find_summary("missing").await.unwrap().is_none());
    assert!(!client.delete_summary("missing").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires POSTGRES_URL"]
async fn concurrent_allocations_are_distinct() {
    let client = client().await;
    let pipeline_id = create(&client, 0, 0, 0).await;
    let allocator = BuildNumberAllocator::new(client.clone());

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let allocator = allocator.clone();
            let pipeline_id = pipeline_id.clone();
            tokio::spawn(async move { allocator.allocate(&pipeline_id).await.unwrap() })
        })
        .collect();

    let mut numbers = BTreeSet::new();
    for task in tasks {
        assert!(numbers.insert(task.await.unwrap()));
    }
    assert_eq!(numbers, (1..=32).collect::<BTreeSet<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires POSTGRES_URL"]
async fn concurrent_lifecycles_balance() {
    let client = client().await;
    let pipeline_id = create(&client, 0, 0, 0).await;
    let engine = TransitionEngine::new(client.clone());

    let tasks: Vec<_> = (0..16)
        .map(|n| {
            let engine = engine.clone();
            let pipeline_id = pipeline_id.clone();
            tokio::spawn(async move {
                let build_id = format!("b-{n}");
                engine.enqueue(&pipeline_id, 1).await.unwrap();
                engine.start(&pipeline_id, &build_id, "ci", 1).await.unwrap();
                engine
                    .finish(&pipeline_id, &build_id, BuildStatus::Succeed)
                    .await
                    .unwrap();
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let summary = client.find_summary(&pipeline_id).await.unwrap().unwrap();
    assert_eq!(summary.counters(), SummaryCounters::new(0, 0, 16));
}

#[tokio::test]
#[ignore = "requires POSTGRES_URL"]
async fn overview_listing() {
    let client = client().await;
    let pipeline_id = create(&client, 1, 0, 0).await;
    let project_id = unique_id("project");

    let mut conn = client.get_connection().await.unwrap();
    diesel::sql_query(
        "INSERT INTO pipeline_infos (pipeline_id, project_id, pipeline_name, channel, creator) \
         VALUES ($1, $2, 'nightly', 'BS', 'alice')",
    )
    .bind::<diesel::sql_types::Text, _>(&pipeline_id)
    .bind::<diesel::sql_types::Text, _>(&project_id)
    .execute(&mut **conn)
    .await
    .unwrap();
    diesel::sql_query("INSERT INTO pipeline_settings (pipeline_id, description) VALUES ($1, 'it')")
        .bind::<diesel::sql_types::Text, _>(&pipeline_id)
        .execute(&mut **conn)
        .await
        .unwrap();

    let filter = OverviewFilter::for_project(&project_id, ChannelCode::Bs);
    let page = conn
        .list_pipeline_overviews(&filter, OffsetPagination::new(10, 0).with_count())
        .await
        .unwrap();
    assert_eq!(page.total, Some(1));
    assert_eq!(page.items[0].pipeline_id, pipeline_id);
    assert_eq!(page.items[0].summary.queue_count, 1);

    let other_channel = OverviewFilter::for_project(&project_id, ChannelCode::Codecc);
    assert!(
        conn.list_all_pipeline_overviews(&other_channel)
            .await
            .unwrap()
            .is_empty()
    );

    let deleted = OverviewFilter::for_pipelines([pipeline_id.clone()]).deleted(true);
    assert!(conn.list_all_pipeline_overviews(&deleted).await.unwrap().is_empty());

    let summaries = conn
        .find_build_summaries(&[pipeline_id.clone(), "missing".to_owned(), pipeline_id.clone()])
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
}
