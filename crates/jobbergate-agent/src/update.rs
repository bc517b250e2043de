//! Bring active job submissions in line with what SLURM reports.

use jobbergate_state::reconcile;

use crate::errors::AgentError;
use crate::ports::{JobScheduler, SubmissionApi};

/// Outcome of one status pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated: usize,
    pub unchanged: usize,
    /// Scheduler or API errors; retried on the next pass
    pub skipped: usize,
}

pub async fn update_active<A, S>(api: &A, scheduler: &S) -> Result<UpdateSummary, AgentError>
where
    A: SubmissionApi + ?Sized,
    S: JobScheduler + ?Sized,
{
    let active = api.active_submissions().await?;
    tracing::debug!("{} active job submissions", active.len());

    let mut summary = UpdateSummary::default();
    for submission in &active {
        let observed = match scheduler.job(submission.slurm_job_id).await {
            Ok(observed) => observed,
            Err(e) => {
                tracing::warn!(
                    submission_id = submission.id,
                    slurm_job_id = submission.slurm_job_id,
                    "could not query SLURM: {}",
                    e
                );
                summary.skipped += 1;
                continue;
            }
        };

        let Some(report) = reconcile(submission, observed.as_ref()) else {
            summary.unchanged += 1;
            continue;
        };

        match api.update_status(submission.id, &report).await {
            Ok(()) => {
                tracing::info!(
                    submission_id = submission.id,
                    slurm_job_id = submission.slurm_job_id,
                    "status {} (SLURM {})",
                    report.status,
                    report.slurm_job_state.as_deref().unwrap_or("-")
                );
                summary.updated += 1;
            }
            Err(e) => {
                tracing::error!(submission_id = submission.id, "status update failed: {}", e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, FakeScheduler};
    use jobbergate_slurm::{SlurmJob, SlurmJobState};
    use jobbergate_state::{ActiveJobSubmission, JobSubmissionStatus, NOT_FOUND_REASON};

    fn active(id: i64, slurm_job_id: u64, last_state: Option<&str>) -> ActiveJobSubmission {
        ActiveJobSubmission {
            id,
            name: format!("job-{id}"),
            slurm_job_id,
            slurm_job_state: last_state.map(str::to_string),
        }
    }

    fn scheduler_with(jobs: &[(u64, SlurmJobState)]) -> FakeScheduler {
        FakeScheduler {
            jobs: jobs
                .iter()
                .map(|(id, state)| (*id, SlurmJob::new(*id, state.clone())))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reports_terminal_and_changed_states_only() {
        let api = FakeApi {
            active: vec![
                active(1, 101, Some("RUNNING")),
                active(2, 102, Some("PENDING")),
                active(3, 103, Some("RUNNING")),
            ],
            ..Default::default()
        };
        let scheduler = scheduler_with(&[
            (101, SlurmJobState::Completed),
            (102, SlurmJobState::Running),
            (103, SlurmJobState::Running),
        ]);

        let summary = update_active(&api, &scheduler).await.unwrap();

        assert_eq!(
            summary,
            UpdateSummary {
                updated: 2,
                unchanged: 1,
                skipped: 0
            }
        );
        let updates = api.updates.lock().unwrap();
        assert_eq!(updates[0].0, 1);
        assert_eq!(updates[0].1.status, JobSubmissionStatus::Completed);
        assert_eq!(updates[1].0, 2);
        assert_eq!(updates[1].1.status, JobSubmissionStatus::Submitted);
        assert_eq!(updates[1].1.slurm_job_state.as_deref(), Some("RUNNING"));
    }

    #[tokio::test]
    async fn test_forgotten_job_is_unknown() {
        let api = FakeApi {
            active: vec![active(4, 104, Some("RUNNING"))],
            ..Default::default()
        };
        let scheduler = FakeScheduler::default();

        update_active(&api, &scheduler).await.unwrap();

        let updates = api.updates.lock().unwrap();
        assert_eq!(updates[0].1.status, JobSubmissionStatus::Unknown);
        assert_eq!(
            updates[0].1.slurm_job_state_reason.as_deref(),
            Some(NOT_FOUND_REASON)
        );
    }

    #[tokio::test]
    async fn test_errors_skip_only_the_affected_submission() {
        let api = FakeApi {
            active: vec![
                active(5, 105, None),
                active(6, 106, None),
                active(7, 107, None),
            ],
            reports_down_for: [7].into(),
            ..Default::default()
        };
        let mut scheduler = scheduler_with(&[
            (106, SlurmJobState::Failed),
            (107, SlurmJobState::Cancelled),
        ]);
        scheduler.broken.insert(105);

        let summary = update_active(&api, &scheduler).await.unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 2);
        let updates = api.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.status, JobSubmissionStatus::Failed);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let api = FakeApi {
            listing_down: true,
            ..Default::default()
        };
        assert!(
            update_active(&api, &FakeScheduler::default())
                .await
                .is_err()
        );
    }
}
