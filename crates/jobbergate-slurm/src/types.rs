//! SLURM job types.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// SLURM job state, as reported by scontrol, squeue or sacct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlurmJobState {
    Pending,
    Configuring,
    Running,
    Completing,
    Suspended,
    Stopped,
    Signaling,
    StageOut,
    Resizing,
    Requeued,
    RequeueHold,
    RequeueFed,
    SpecialExit,
    ResvDelHold,
    Completed,
    Failed,
    Timeout,
    OutOfMemory,
    NodeFail,
    BootFail,
    Deadline,
    Cancelled,
    Preempted,
    Revoked,
    Unknown(String),
}

impl SlurmJobState {
    /// Parse a SLURM state string.
    ///
    /// Accepts long names and squeue short codes. Decorations such as
    /// `CANCELLED by 1000` or `COMPLETED+` are ignored.
    pub fn parse(s: &str) -> Self {
        let base = s
            .split_whitespace()
            .next()
            .unwrap_or(s)
            .trim_end_matches('+')
            .to_uppercase();

        match base.as_str() {
            "PENDING" | "PD" => Self::Pending,
            "CONFIGURING" | "CF" => Self::Configuring,
            "RUNNING" | "R" => Self::Running,
            "COMPLETING" | "CG" => Self::Completing,
            "SUSPENDED" | "S" => Self::Suspended,
            "STOPPED" | "ST" => Self::Stopped,
            "SIGNALING" | "SI" => Self::Signaling,
            "STAGE_OUT" | "SO" => Self::StageOut,
            "RESIZING" | "RS" => Self::Resizing,
            "REQUEUED" | "RQ" => Self::Requeued,
            "REQUEUE_HOLD" | "RH" => Self::RequeueHold,
            "REQUEUE_FED" | "RF" => Self::RequeueFed,
            "SPECIAL_EXIT" | "SE" => Self::SpecialExit,
            "RESV_DEL_HOLD" | "RD" => Self::ResvDelHold,
            "COMPLETED" | "CD" => Self::Completed,
            "FAILED" | "F" => Self::Failed,
            "TIMEOUT" | "TO" => Self::Timeout,
            "OUT_OF_MEMORY" | "OOM" => Self::OutOfMemory,
            "NODE_FAIL" | "NF" => Self::NodeFail,
            "BOOT_FAIL" | "BF" => Self::BootFail,
            "DEADLINE" | "DL" => Self::Deadline,
            "CANCELLED" | "CA" => Self::Cancelled,
            "PREEMPTED" | "PR" => Self::Preempted,
            "REVOKED" | "RV" => Self::Revoked,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the job is still queued, running or otherwise not finished.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
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
                | Self::ResvDelHold
        )
    }

    /// The canonical SLURM name of this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Configuring => "CONFIGURING",
            Self::Running => "RUNNING",
            Self::Completing => "COMPLETING",
            Self::Suspended => "SUSPENDED",
            Self::Stopped => "STOPPED",
            Self::Signaling => "SIGNALING",
            Self::StageOut => "STAGE_OUT",
            Self::Resizing => "RESIZING",
            Self::Requeued => "REQUEUED",
            Self::RequeueHold => "REQUEUE_HOLD",
            Self::RequeueFed => "REQUEUE_FED",
            Self::SpecialExit => "SPECIAL_EXIT",
            Self::ResvDelHold => "RESV_DEL_HOLD",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::NodeFail => "NODE_FAIL",
            Self::BootFail => "BOOT_FAIL",
            Self::Deadline => "DEADLINE",
            Self::Cancelled => "CANCELLED",
            Self::Preempted => "PREEMPTED",
            Self::Revoked => "REVOKED",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SlurmJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SLURM job information from scontrol/sacct.
#[derive(Debug, Clone)]
pub struct SlurmJob {
    /// SLURM job ID
    pub job_id: u64,

    /// Job name
    pub name: String,

    /// Job state
    pub state: SlurmJobState,

    /// Why the job is in its current state
    pub state_reason: Option<String>,

    /// Exit code of the batch script, once known
    pub exit_code: Option<i32>,

    /// Signal that terminated the batch script
    pub exit_signal: Option<i32>,

    /// Partition
    pub partition: Option<String>,

    /// Submit time
    pub submit_time: Option<DateTime<Utc>>,

    /// Start time
    pub start_time: Option<DateTime<Utc>>,

    /// End time
    pub end_time: Option<DateTime<Utc>>,

    /// Node list
    pub nodelist: Option<String>,

    /// Time limit
    pub time_limit: Option<Duration>,

    /// Raw fields as reported by the scheduler
    pub info: BTreeMap<String, String>,
}

impl SlurmJob {
    /// A job carrying only an id and a state.
    pub fn new(job_id: u64, state: SlurmJobState) -> Self {
        Self {
            job_id,
            name: String::new(),
            state,
            state_reason: None,
            exit_code: None,
            exit_signal: None,
            partition: None,
            submit_time: None,
            start_time: None,
            end_time: None,
            nodelist: None,
            time_limit: None,
            info: BTreeMap::new(),
        }
    }

    /// Id of the job array this record belongs to, if any.
    ///
    /// scontrol reports `ArrayJobId`; sacct encodes it in `JobID` as
    /// `<array>_<task>` or `<array>_[<range>]`.
    pub fn array_job_id(&self) -> Option<u64> {
        if let Some(id) = self.info.get("ArrayJobId") {
            return id.parse().ok();
        }
        self.info
            .get("JobID")
            .and_then(|id| id.split_once('_'))
            .and_then(|(array, _)| array.parse().ok())
    }
}

/// Pick the record that stands for `job_id` among everything a query returned.
///
/// A job array yields one record per task in no guaranteed order. The array
/// counts as active while any task is, and as failed when any finished task
/// did not complete. The returned record always carries `job_id`.
pub(crate) fn select_job(records: Vec<SlurmJob>, job_id: u64) -> Option<SlurmJob> {
    let mut related: Vec<SlurmJob> = records
        .into_iter()
        .filter(|j| j.job_id == job_id || j.array_job_id() == Some(job_id))
        .collect();

    let pick = related
        .iter()
        .position(|j| j.state.is_active() && j.job_id == job_id)
        .or_else(|| related.iter().position(|j| j.state.is_active()))
        .or_else(|| {
            related
                .iter()
                .position(|j| j.state != SlurmJobState::Completed)
        })
        .or_else(|| related.iter().position(|j| j.job_id == job_id))
        .or_else(|| (!related.is_empty()).then_some(0))?;

    let mut job = related.swap_remove(pick);
    job.job_id = job_id;
    Some(job)
}
