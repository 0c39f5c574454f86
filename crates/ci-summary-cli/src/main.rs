#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use std::process;

use anyhow::Context;
use ci_summary_core::SummaryError;
use ci_summary_postgres::{PgClient, PgClientMigrationExt, PgError};

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "ci_summary_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "ci_summary_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "ci_summary_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    let hint = error_hint(&error);
    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = format!("{error:#}"),
            hint = hint.as_deref(),
            "Command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
        if let Some(hint) = hint {
            eprintln!("Hint: {hint}");
        }
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    telemetry::init_tracing()?;
    cli.log();

    let client = connect(&cli).await?;
    if cli.migrate {
        let result = client
            .run_pending_migrations()
            .await
            .context("failed to apply pending migrations")?;
        tracing::info!(
            target: TRACING_TARGET_STARTUP,
            applied = result.processed_versions.len(),
            "Migrations checked"
        );
    }

    let output = commands::execute(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Returns the operator hint of the first store error in the chain.
fn error_hint(error: &anyhow::Error) -> Option<String> {
    error.chain().find_map(|cause| {
        if let Some(error) = cause.downcast_ref::<PgError>() {
            return Some(error.hint().into_owned());
        }

        let error = cause.downcast_ref::<SummaryError>()?;
        if let SummaryError::Storage(inner) = error
            && let Some(pg_error) = inner.downcast_ref::<PgError>()
        {
            return Some(pg_error.hint().into_owned());
        }

        Some(error.hint().into_owned())
    })
}

/// Builds the pooled client and checks that the database answers.
async fn connect(cli: &Cli) -> anyhow::Result<PgClient> {
    cli.postgres
        .validate()
        .context("invalid postgres configuration")?;

    PgClient::new_with_test(cli.postgres.clone())
        .await
        .with_context(|| {
            format!(
                "failed to connect to {}",
                cli.postgres.database_url_masked()
            )
        })
}
