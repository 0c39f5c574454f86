use std::time::Instant;

use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::PoolableConnection;
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use super::{MigrationResult, get_migration_status};
use crate::{MIGRATIONS, PgClient, PgError, PgResult, TRACING_TARGET_MIGRATION};

/// Applies every embedded migration the database has not recorded yet.
///
/// The diesel harness is synchronous, so it runs on a blocking thread over an
/// [`AsyncConnectionWrapper`] of a pooled connection.
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn run_pending_migrations(pg: &PgClient) -> PgResult<MigrationResult> {
    let start_time = Instant::now();
    let mut conn = pg.get_pooled_connection().await?;
    let initial_status = get_migration_status(&mut conn).await?;

    if initial_status.is_up_to_date() {
        tracing::info!(
            target: TRACING_TARGET_MIGRATION,
            last_applied = initial_status.last_applied_version(),
            "Summary store schema is up to date"
        );
        return Ok(MigrationResult::new(start_time.elapsed(), vec![]));
    }

    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        pending_migrations = initial_status.pending_migrations(),
        next_version = initial_status.next_pending_version(),
        "Applying pending migrations"
    );

    ensure_usable(&mut conn, "before")?;
    let mut conn: AsyncConnectionWrapper<_> = conn.into();
    let joined = spawn_blocking(move || {
        let versions = conn
            .run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.into_iter().map(|v| v.to_string()).collect::<Vec<_>>());
        (versions, conn)
    })
    .await;

    let duration = start_time.elapsed();
    let (versions, mut conn) = joined.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            duration = ?duration,
            error = %err,
            "Migration task did not complete"
        );
        PgError::Migration(err.into())
    })?;

    let versions = versions.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            duration = ?duration,
            error = %err,
            "Migration failed"
        );
        PgError::Migration(err)
    })?;
    ensure_usable(&mut conn, "after")?;

    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        duration = ?duration,
        migrations_count = versions.len(),
        "Migrations applied"
    );

    Ok(MigrationResult::new(duration, versions))
}

fn ensure_usable(conn: &mut AsyncPgConnection, stage: &'static str) -> PgResult<()> {
    if conn.is_broken() {
        tracing::error!(target: TRACING_TARGET_MIGRATION, stage, "Connection is broken around migrations");
        return Err(PgError::Migration(
            format!("connection broken {stage} running migrations").into(),
        ));
    }

    Ok(())
}
