#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for build lifecycle transitions.
///
/// Use this target for logging enqueue, start, task, finish and running-count events,
/// including stale and compensated outcomes.
pub const TRACING_TARGET_TRANSITION: &str = "ci_summary_core::transitions";

/// Tracing target for summary row creation, deletion and reconciliation.
pub const TRACING_TARGET_LIFECYCLE: &str = "ci_summary_core::lifecycle";

/// Tracing target for build number allocation.
pub const TRACING_TARGET_ALLOCATOR: &str = "ci_summary_core::allocator";

mod allocator;
mod error;
mod lifecycle;
mod memory;
mod status;
mod store;
mod summary;
mod transition;

pub use crate::allocator::BuildNumberAllocator;
pub use crate::error::{BoxError, SummaryError, SummaryResult};
pub use crate::lifecycle::SummaryLifecycle;
pub use crate::memory::MemorySummaryStore;
pub use crate::status::BuildStatus;
pub use crate::store::{BuildNumChange, SummaryStore, SummaryUpdate};
pub use crate::summary::{BuildSummary, NewBuildSummary, SummaryCounters};
pub use crate::transition::{Transition, TransitionEngine};
