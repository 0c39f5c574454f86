//! Build status enumeration persisted by ordinal code.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Status of a build as surfaced in the summary's `latest_status` field.
///
/// Stores persist only the numeric [`code`] of a status. The codes are stable
/// and must never be reordered.
///
/// [`code`]: BuildStatus::code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i32)]
pub enum BuildStatus {
    /// Build finished successfully.
    Succeed = 0,
    /// Build failed.
    Failed = 1,
    /// Build was cancelled by a user.
    Canceled = 2,
    /// Build is executing.
    Running = 3,
    /// Build was terminated by the system.
    Terminate = 4,
    /// Build is waiting for a manual review.
    Reviewing = 5,
    /// Review rejected the build.
    ReviewAbort = 6,
    /// Review approved the build.
    ReviewProcessed = 7,
    /// Build agent stopped sending heartbeats.
    HeartbeatTimeout = 8,
    /// Build environment is being prepared.
    PrepareEnv = 9,
    /// Build was never executed.
    Unexec = 10,
    /// Build was skipped.
    Skip = 11,
    /// Quality gate rejected the build.
    QualityCheckFail = 12,
    /// Build is waiting in the queue.
    Queue = 13,
    /// Build exceeded its queue time limit.
    QueueTimeout = 17,
    /// Build exceeded its execution time limit.
    ExecTimeout = 18,
    /// A stage finished while the build continues.
    StageSuccess = 22,
}

impl BuildStatus {
    /// Returns the ordinal code persisted by stores.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Resolves a persisted ordinal code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::iter().find(|status| status.code() == code)
    }

    /// Returns whether the build is still waiting to run.
    #[inline]
    pub fn is_queued(self) -> bool {
        matches!(self, Self::Queue)
    }

    /// Returns whether the build is executing or partially done.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(
            self,
            Self::Running | Self::PrepareEnv | Self::Reviewing | Self::StageSuccess
        )
    }

    /// Returns whether the status is terminal.
    #[inline]
    pub fn is_finished(self) -> bool {
        !self.is_queued() && !self.is_running()
    }

    /// Returns whether the build finished successfully.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeed | Self::ReviewProcessed | Self::Skip)
    }

    /// Returns whether the build finished unsuccessfully.
    #[inline]
    pub fn is_failure(self) -> bool {
        self.is_finished() && !self.is_success() && !self.is_cancel()
    }

    /// Returns whether the build was stopped before completing.
    #[inline]
    pub fn is_cancel(self) -> bool {
        matches!(self, Self::Canceled | Self::Terminate | Self::ReviewAbort)
    }
}
