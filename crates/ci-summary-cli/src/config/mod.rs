//! Command-line configuration.
//!
//! ```text
//! Cli
//! ├── postgres: PgConfig   # POSTGRES_* connection and pool settings
//! ├── migrate: bool        # apply pending migrations first
//! └── command: Command     # what to do
//! ```

mod command;

use std::process;

use ci_summary_postgres::PgConfig;
use clap::Parser;
pub use command::Command;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "ci-summary")]
#[command(about = "Inspect and maintain CI pipeline build summaries")]
#[command(version)]
pub struct Cli {
    /// Summary store connection settings.
    #[clap(flatten)]
    pub postgres: PgConfig,

    /// Apply pending migrations before running the command.
    #[arg(long, env = "CI_SUMMARY_MIGRATE", global = true)]
    pub migrate: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads `.env` (if enabled) and parses the command line.
    ///
    /// `.env` is loaded first so clap can use its values as defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information and the connection settings without secrets.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            postgres_url = %self.postgres.database_url_masked(),
            postgres_max_connections = self.postgres.postgres_max_connections,
            postgres_connection_timeout_secs = ?self.postgres.postgres_connection_timeout_secs,
            postgres_idle_timeout_secs = ?self.postgres.postgres_idle_timeout_secs,
            migrate = self.migrate,
            command = self.command.name(),
            "Configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
