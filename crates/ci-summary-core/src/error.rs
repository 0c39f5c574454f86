//! Error types shared by every summary store and engine component.

use std::borrow::Cow;

/// Type-erased error type for storage backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for build summary operations.
///
/// A guarded update that matches no row is not an error: it is reported as
/// [`Transition::Stale`] or handled by the finish compensation path.
///
/// [`Transition::Stale`]: crate::Transition::Stale
#[derive(Debug, thiserror::Error)]
#[must_use = "summary errors should be handled appropriately"]
pub enum SummaryError {
    /// No summary row exists for the pipeline.
    ///
    /// Usually the pipeline was deleted while one of its builds was still
    /// reporting lifecycle events.
    #[error("No build summary for pipeline '{pipeline_id}'")]
    NotFound {
        /// Pipeline the operation targeted.
        pipeline_id: String,
    },

    /// A summary row already exists for the pipeline.
    #[error("Build summary for pipeline '{pipeline_id}' already exists")]
    AlreadyExists {
        /// Pipeline the operation targeted.
        pipeline_id: String,
    },

    /// The underlying store failed (connectivity, constraint, transaction).
    ///
    /// Never retried internally.
    #[error("Summary storage error: {0}")]
    Storage(BoxError),
}

impl SummaryError {
    /// Creates a [`SummaryError::NotFound`] for the pipeline.
    pub fn not_found(pipeline_id: impl Into<String>) -> Self {
        Self::NotFound {
            pipeline_id: pipeline_id.into(),
        }
    }

    /// Creates a [`SummaryError::AlreadyExists`] for the pipeline.
    pub fn already_exists(pipeline_id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            pipeline_id: pipeline_id.into(),
        }
    }

    /// Wraps a backend error as a [`SummaryError::Storage`].
    pub fn storage(error: impl Into<BoxError>) -> Self {
        Self::Storage(error.into())
    }

    /// Returns whether the targeted summary row does not exist.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns a short hint for operators.
    pub fn hint(&self) -> Cow<'static, str> {
        match self {
            Self::NotFound { .. } => {
                Cow::Borrowed("Create the pipeline summary before reporting build events")
            }
            Self::AlreadyExists { .. } => {
                Cow::Borrowed("Summary rows are created once per pipeline")
            }
            Self::Storage(_) => Cow::Borrowed("Check storage connectivity, the caller may retry"),
        }
    }
}

/// Specialized [`Result`] type for summary operations.
pub type SummaryResult<T, E = SummaryError> = Result<T, E>;
