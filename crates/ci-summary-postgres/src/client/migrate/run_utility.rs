use std::collections::BTreeSet;

use diesel::migration::MigrationSource;
use diesel::pg::Pg;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::MigrationStatus;
use crate::{MIGRATIONS, PgError, PgResult, TRACING_TARGET_MIGRATION};

#[derive(diesel::QueryableByName)]
struct Exists {
    #[diesel(sql_type = diesel::sql_types::Bool)]
    exists: bool,
}

#[derive(diesel::QueryableByName)]
struct MigrationVersion {
    #[diesel(sql_type = diesel::sql_types::Text)]
    version: String,
}

/// Compares the embedded migrations with the versions recorded by the database.
///
/// A database that never ran migrations reports every embedded version as pending.
#[tracing::instrument(skip(conn), target = TRACING_TARGET_MIGRATION)]
pub async fn get_migration_status(conn: &mut AsyncPgConnection) -> PgResult<MigrationStatus> {
    let applied_versions = if table_exists(conn, "__diesel_schema_migrations").await? {
        diesel::sql_query("SELECT version FROM __diesel_schema_migrations ORDER BY version")
            .get_results::<MigrationVersion>(conn)
            .await
            .map_err(|e| PgError::Migration(format!("failed to list applied migrations: {e}").into()))?
            .into_iter()
            .map(|row| row.version)
            .collect()
    } else {
        Vec::new()
    };

    let applied: BTreeSet<&str> = applied_versions.iter().map(String::as_str).collect();
    let mut pending_versions: Vec<String> = MigrationSource::<Pg>::migrations(&MIGRATIONS)
        .map_err(PgError::Migration)?
        .iter()
        .map(|migration| migration.name().version().to_string())
        .filter(|version| !applied.contains(version.as_str()))
        .collect();
    pending_versions.sort();

    let status = MigrationStatus::new(applied_versions, pending_versions);
    tracing::debug!(
        target: TRACING_TARGET_MIGRATION,
        last_applied = status.last_applied_version(),
        pending_count = status.pending_migrations(),
        "Migration status retrieved"
    );

    Ok(status)
}

/// Checks that migrations ran and the summary table exists.
#[tracing::instrument(skip(conn), target = TRACING_TARGET_MIGRATION)]
pub async fn verify_schema_integrity(conn: &mut AsyncPgConnection) -> PgResult<()> {
    let status = get_migration_status(conn).await?;
    if !status.is_up_to_date() {
        tracing::warn!(
            target: TRACING_TARGET_MIGRATION,
            pending_count = status.pending_migrations(),
            "Summary store schema has pending migrations"
        );
        return Err(PgError::Migration(
            format!("{} migrations pending", status.pending_migrations()).into(),
        ));
    }

    if !table_exists(conn, "pipeline_build_summaries").await? {
        return Err(PgError::Migration(
            "table pipeline_build_summaries does not exist".into(),
        ));
    }

    tracing::info!(target: TRACING_TARGET_MIGRATION, "Summary store schema verified");
    Ok(())
}

async fn table_exists(conn: &mut AsyncPgConnection, table: &str) -> PgResult<bool> {
    let row = diesel::sql_query("SELECT to_regclass($1) IS NOT NULL AS exists")
        .bind::<diesel::sql_types::Text, _>(table)
        .get_result::<Exists>(conn)
        .await?;

    Ok(row.exists)
}
