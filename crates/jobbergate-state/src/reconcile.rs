//! Decide what, if anything, to tell the API about an active submission.

use crate::models::{ActiveJobSubmission, StatusReport};
use crate::types::{JobSubmissionStatus, ToSubmissionStatus};
use jobbergate_slurm::SlurmJob;

/// Reason reported when the scheduler has no record of a job.
pub const NOT_FOUND_REASON: &str = "job not found in scheduler";

/// Compare an active submission with what the scheduler reports.
///
/// `observed` is None when neither scontrol nor sacct know the job.
/// Returns the report to send, or None when the API is already up to date.
pub fn reconcile(
    active: &ActiveJobSubmission,
    observed: Option<&SlurmJob>,
) -> Option<StatusReport> {
    let Some(job) = observed else {
        return Some(StatusReport {
            status: JobSubmissionStatus::Unknown,
            slurm_job_id: active.slurm_job_id,
            slurm_job_state: None,
            slurm_job_info: None,
            slurm_job_state_reason: Some(NOT_FOUND_REASON.to_string()),
        });
    };

    let status = job.state.to_submission_status();
    let state = job.state.as_str();
    let state_changed = active.slurm_job_state.as_deref() != Some(state);

    if !status.is_terminal() && !state_changed {
        return None;
    }

    Some(StatusReport {
        status,
        slurm_job_id: active.slurm_job_id,
        slurm_job_state: Some(state.to_string()),
        slurm_job_info: serde_json::to_string(&job.info).ok(),
        slurm_job_state_reason: job.state_reason.clone(),
    })
}
