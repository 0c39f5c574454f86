#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Embeds all migrations into the final binary.
pub(crate) const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!();

// Tracing target constants for consistent logging.

/// Tracing target for connection establishment, pool management and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "ci_summary_postgres::connection";

/// Tracing target for summary and listing query execution.
pub const TRACING_TARGET_QUERY: &str = "ci_summary_postgres::queries";

/// Tracing target for migration application and status checks.
pub const TRACING_TARGET_MIGRATION: &str = "ci_summary_postgres::migrations";

mod client;
mod error;
pub mod model;
pub mod query;
mod schema;
mod store;
pub mod types;

pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::{
    ConnectionPool, MigrationResult, MigrationStatus, PgClient, PgClientMigrationExt, PgConfig,
    PgConn, PgPoolStatus, PooledConnection, get_migration_status, run_pending_migrations,
    verify_schema_integrity,
};
pub use crate::error::{PgError, PgResult};
