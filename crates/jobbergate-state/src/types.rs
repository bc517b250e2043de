//! Platform job submission status and its SLURM translation.

use jobbergate_slurm::SlurmJobState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a job submission as tracked by the Jobbergate API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSubmissionStatus {
    /// Created by a user, waiting for the agent
    Created,
    /// Accepted by the scheduler
    Submitted,
    /// The agent could not submit it
    Rejected,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
    /// Cancelled or preempted
    Cancelled,
    /// The scheduler state could not be interpreted
    Unknown,
}

impl JobSubmissionStatus {
    /// Whether no further updates are expected.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Created | Self::Submitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Submitted => "SUBMITTED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobSubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for converting scheduler-specific states to the platform status.
pub trait ToSubmissionStatus {
    fn to_submission_status(&self) -> JobSubmissionStatus;
}

impl ToSubmissionStatus for SlurmJobState {
    fn to_submission_status(&self) -> JobSubmissionStatus {
        match self {
            Self::Pending
            | Self::Configuring
            | Self::Running
            | Self::Completing
            | Self::Suspended
            | Self::Stopped
            | Self::Signaling
            | Self::StageOut
            | Self::Resizing
            | Self::Requeued
            | Self::RequeueHold
            | Self::RequeueFed
            | Self::SpecialExit
            | Self::ResvDelHold => JobSubmissionStatus::Submitted,
            Self::Completed => JobSubmissionStatus::Completed,
            Self::Failed
            | Self::Timeout
            | Self::OutOfMemory
            | Self::NodeFail
            | Self::BootFail
            | Self::Deadline => JobSubmissionStatus::Failed,
            Self::Cancelled | Self::Preempted | Self::Revoked => JobSubmissionStatus::Cancelled,
            Self::Unknown(_) => JobSubmissionStatus::Unknown,
        }
    }
}
