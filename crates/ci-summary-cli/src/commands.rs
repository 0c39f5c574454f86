//! Command execution.

use anyhow::Context;
use ci_summary_core::{
    BuildNumberAllocator, BuildSummary, SummaryCounters, SummaryLifecycle, SummaryStore,
    Transition, TransitionEngine,
};
use ci_summary_postgres::query::PipelineOverviewRepository;
use ci_summary_postgres::{PgClient, PgClientMigrationExt};
use serde_json::{Value, json};

use crate::TRACING_TARGET_COMMAND;
use crate::config::Command;

/// Runs a command against the store and returns its JSON report.
pub(crate) async fn execute(client: &PgClient, command: Command) -> anyhow::Result<Value> {
    let name = command.name();
    tracing::debug!(target: TRACING_TARGET_COMMAND, command = name, "Running command");

    let lifecycle = SummaryLifecycle::new(client.clone());
    let engine = TransitionEngine::new(client.clone());
    let allocator = BuildNumberAllocator::new(client.clone());

    let output = match command {
        Command::Migrate { status: true } => {
            let status = client.get_migration_status().await?;
            serde_json::to_value(status)?
        }
        Command::Migrate { status: false } => {
            let result = client.run_pending_migrations().await?;
            client
                .verify_schema_integrity()
                .await
                .context("schema is not usable after migrating")?;
            serde_json::to_value(result)?
        }

        Command::Create {
            pipeline_id,
            project_id,
            build_no,
        } => {
            let summary = lifecycle.create(&pipeline_id, &project_id, build_no).await?;
            serde_json::to_value(summary)?
        }
        Command::Delete { pipeline_id } => {
            let deleted = lifecycle.delete(&pipeline_id).await?;
            json!({ "pipeline_id": pipeline_id, "deleted": deleted })
        }
        Command::Show { pipeline_ids } => match pipeline_ids.as_slice() {
            [pipeline_id] => {
                let summary = lifecycle
                    .get(pipeline_id)
                    .await?
                    .with_context(|| format!("pipeline {pipeline_id} has no build summary"))?;
                serde_json::to_value(summary)?
            }
            _ => serde_json::to_value(lifecycle.get_many(&pipeline_ids).await?)?,
        },
        Command::List(args) => {
            let mut conn = client.get_connection().await?;
            let pagination = args.pagination();
            let page = conn
                .list_pipeline_overviews(&args.filter(), pagination)
                .await?;
            json!({
                "items": page.items,
                "total": page.total,
                "has_more": page.has_more(&pagination),
            })
        }

        Command::Enqueue { pipeline_id, count } => {
            let outcome = engine.enqueue(&pipeline_id, count).await?;
            transition_report(client, &pipeline_id, outcome).await?
        }
        Command::Start {
            pipeline_id,
            build_id,
            user,
            task_count,
        } => {
            let outcome = engine
                .start(&pipeline_id, &build_id, &user, task_count)
                .await?;
            transition_report(client, &pipeline_id, outcome).await?
        }
        Command::Task {
            pipeline_id,
            build_id,
            task_id,
            task_name,
        } => {
            let outcome = engine
                .update_current_task(&pipeline_id, &build_id, &task_id, &task_name)
                .await?;
            transition_report(client, &pipeline_id, outcome).await?
        }
        Command::Finish {
            pipeline_id,
            build_id,
            status,
        } => {
            let outcome = engine.finish(&pipeline_id, &build_id, status).await?;
            transition_report(client, &pipeline_id, outcome).await?
        }
        Command::Adjust {
            pipeline_id,
            build_id,
            delta,
        } => {
            let outcome = engine
                .adjust_running_count(&pipeline_id, &build_id, delta)
                .await?;
            transition_report(client, &pipeline_id, outcome).await?
        }

        Command::Allocate {
            pipeline_id,
            set: None,
        } => {
            let build_num = allocator.allocate(&pipeline_id).await?;
            json!({ "pipeline_id": pipeline_id, "build_num": build_num })
        }
        Command::Allocate {
            pipeline_id,
            set: Some(value),
        } => {
            let build_num = allocator.override_build_num(&pipeline_id, value).await?;
            json!({ "pipeline_id": pipeline_id, "build_num": build_num })
        }
        Command::BuildNo {
            pipeline_id,
            set: None,
        } => {
            let build_no = allocator.build_no(&pipeline_id).await?;
            json!({ "pipeline_id": pipeline_id, "build_no": build_no })
        }
        Command::BuildNo {
            pipeline_id,
            set: Some(value),
        } => {
            allocator.set_build_no(&pipeline_id, value).await?;
            json!({ "pipeline_id": pipeline_id, "build_no": value })
        }
        Command::Reconcile {
            pipeline_id,
            queue,
            running,
            finish,
        } => {
            let counters = SummaryCounters::new(queue, running, finish);
            let summary = lifecycle.reconcile(&pipeline_id, counters).await?;
            serde_json::to_value(summary)?
        }
    };

    tracing::debug!(target: TRACING_TARGET_COMMAND, command = name, "Command finished");
    Ok(output)
}

/// Reports a transition outcome with the summary as it stands afterwards.
async fn transition_report(
    client: &PgClient,
    pipeline_id: &str,
    outcome: Transition,
) -> anyhow::Result<Value> {
    let summary: Option<BuildSummary> = client.find_summary(pipeline_id).await?;
    Ok(json!({ "outcome": outcome, "summary": summary }))
}
