//! Errors of the PostgreSQL summary store.

use std::borrow::Cow;

use ci_summary_core::{BoxError, SummaryError};
use deadpool::managed::TimeoutType;
use diesel::ConnectionError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::PoolError;
use diesel_async::pooled_connection::deadpool::PoolError as DeadpoolError;

use crate::TRACING_TARGET_CONNECTION;
use crate::types::ConstraintViolation;

/// Error type for every operation of the PostgreSQL summary store.
#[derive(Debug, thiserror::Error)]
#[must_use = "database errors should be handled appropriately"]
pub enum PgError {
    /// The connection settings are invalid.
    #[error("Invalid summary store configuration: {0}")]
    Config(String),

    /// Waiting for, creating or recycling a pooled connection timed out.
    #[error("Summary store {} timed out", timeout_stage(.0))]
    Timeout(TimeoutType),

    /// The database could not be reached or dropped the connection.
    #[error("Summary store connection failed: {0}")]
    Connection(#[from] ConnectionError),

    /// Applying or inspecting the embedded migrations failed.
    #[error("Summary store migration failed: {0}")]
    Migration(BoxError),

    /// A statement was rejected, including constraint violations.
    #[error("Summary store query failed: {0}")]
    Query(#[from] DieselError),

    /// Pool misuse or a hook failure.
    #[error("Unexpected summary store error: {0}")]
    Unexpected(Cow<'static, str>),
}

fn timeout_stage(timeout: &TimeoutType) -> &'static str {
    match timeout {
        TimeoutType::Wait => "connection checkout",
        TimeoutType::Create => "connection setup",
        TimeoutType::Recycle => "connection recycle",
    }
}

impl PgError {
    /// Returns the name of the violated constraint, if any.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Query(DieselError::DatabaseError(_, info)) => info.constraint_name(),
            _ => None,
        }
    }

    /// Returns the violated summary table constraint, if it is a known one.
    pub fn constraint_violation(&self) -> Option<ConstraintViolation> {
        self.constraint().and_then(ConstraintViolation::new)
    }

    /// Returns whether the insert collided with an existing summary row.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Query(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
        )
    }

    /// Returns whether retrying the same statement may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Connection(error) => matches!(error, ConnectionError::BadConnection(_)),
            Self::Query(DieselError::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::ClosedConnection
            ),
            _ => false,
        }
    }

    /// Returns whether retrying the same statement cannot succeed.
    #[inline]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Returns a short hint for operators.
    pub fn hint(&self) -> Cow<'static, str> {
        match self {
            Self::Config(_) => "Check the POSTGRES_* settings".into(),
            Self::Timeout(TimeoutType::Wait) => {
                "The pool is exhausted, raise POSTGRES_MAX_CONNECTIONS or slow down event delivery"
                    .into()
            }
            Self::Timeout(_) | Self::Connection(_) => {
                "Check POSTGRES_URL and that the database is reachable".into()
            }
            Self::Migration(_) => "Run `ci-summary migrate --status` to inspect the schema".into(),
            Self::Query(_) => match self.constraint_violation() {
                Some(violation) => format!("Rejected by the {violation} constraint").into(),
                None => "The statement was rejected by the database".into(),
            },
            Self::Unexpected(_) => "Retry the command, the pool may be shutting down".into(),
        }
    }
}

impl From<DeadpoolError> for PgError {
    fn from(value: DeadpoolError) -> Self {
        match value {
            DeadpoolError::Timeout(timeout) => Self::Timeout(timeout),
            DeadpoolError::Backend(PoolError::ConnectionError(error)) => Self::Connection(error),
            DeadpoolError::Backend(PoolError::QueryError(error)) => Self::Query(error),
            DeadpoolError::Closed => Self::Unexpected("connection pool is closed".into()),
            DeadpoolError::NoRuntimeSpecified => {
                tracing::error!(target: TRACING_TARGET_CONNECTION, "Connection pool has no tokio runtime");
                Self::Unexpected("connection pool has no runtime".into())
            }
            DeadpoolError::PostCreateHook(error) => {
                tracing::warn!(target: TRACING_TARGET_CONNECTION, %error, "Post-create hook rejected a connection");
                Self::Unexpected(error.to_string().into())
            }
        }
    }
}

impl From<PgError> for SummaryError {
    fn from(value: PgError) -> Self {
        SummaryError::storage(value)
    }
}

/// Specialized [`Result`] type for database operations.
pub type PgResult<T, E = PgError> = Result<T, E>;
