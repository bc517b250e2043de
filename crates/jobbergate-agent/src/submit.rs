//! Hand pending job submissions to the scheduler.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use jobbergate_cli::UserMapping;
use jobbergate_slurm::SubmitRequest;
use jobbergate_state::{PendingJobSubmission, RejectedReport, SubmittedReport};

use crate::errors::AgentError;
use crate::ports::{JobScheduler, SubmissionApi};
use crate::user_mapper::local_username;

/// Outcome of one submission pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubmitSummary {
    pub submitted: usize,
    pub rejected: usize,
    /// Processed, but the API could not be told the result
    pub unreported: usize,
}

/// What a submission pass needs besides the API and the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SubmitContext<'a> {
    pub user_mapping: &'a UserMapping,
    pub default_work_dir: &'a Utf8Path,
}

/// Submit every pending job submission.
///
/// Failing to list pending submissions is an error; anything that goes
/// wrong with a single submission is reported to the API and the pass
/// moves on.
pub async fn submit_pending<A, S>(
    api: &A,
    scheduler: &S,
    ctx: SubmitContext<'_>,
) -> Result<SubmitSummary, AgentError>
where
    A: SubmissionApi + ?Sized,
    S: JobScheduler + ?Sized,
{
    let pending = api.pending_submissions().await?;
    tracing::debug!("{} pending job submissions", pending.len());

    let mut summary = SubmitSummary::default();
    for submission in &pending {
        match submit_one(api, scheduler, ctx, submission).await {
            Ok(slurm_job_id) => {
                tracing::info!(
                    submission_id = submission.id,
                    slurm_job_id,
                    "job submission accepted by SLURM"
                );
                let report = SubmittedReport {
                    id: submission.id,
                    slurm_job_id,
                    slurm_job_state: None,
                    slurm_job_info: None,
                };
                match api.mark_submitted(&report).await {
                    Ok(()) => summary.submitted += 1,
                    Err(e) => {
                        tracing::error!(
                            submission_id = submission.id,
                            slurm_job_id,
                            "SLURM job submitted but the API was not told: {}",
                            e
                        );
                        summary.unreported += 1;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(submission_id = submission.id, "rejecting job submission: {}", e);
                let report = RejectedReport {
                    id: submission.id,
                    report_message: e.to_string(),
                };
                match api.mark_rejected(&report).await {
                    Ok(()) => summary.rejected += 1,
                    Err(e) => {
                        tracing::error!(
                            submission_id = submission.id,
                            "could not report rejection: {}",
                            e
                        );
                        summary.unreported += 1;
                    }
                }
            }
        }
    }

    Ok(summary)
}

async fn submit_one<A, S>(
    api: &A,
    scheduler: &S,
    ctx: SubmitContext<'_>,
    submission: &PendingJobSubmission,
) -> Result<u64, AgentError>
where
    A: SubmissionApi + ?Sized,
    S: JobScheduler + ?Sized,
{
    let username = local_username(ctx.user_mapping, &submission.owner_email)?;
    let entrypoint = submission.job_script.entrypoint()?;

    let work_dir = submission
        .execution_directory
        .clone()
        .unwrap_or_else(|| ctx.default_work_dir.to_path_buf());
    tokio::fs::create_dir_all(&work_dir)
        .await
        .map_err(AgentError::io(&work_dir))?;

    for file in &submission.job_script.files {
        let path = file_path(&work_dir, &file.filename)?;
        let content = api.download_file(file.parent_id, &file.filename).await?;
        tokio::fs::write(&path, content)
            .await
            .map_err(AgentError::io(&path))?;
        tracing::debug!(submission_id = submission.id, "wrote {}", path);
    }

    let request = SubmitRequest {
        script: file_path(&work_dir, &entrypoint.filename)?,
        job_name: (!names_job(&submission.sbatch_arguments)).then(|| submission.name.clone()),
        sbatch_args: submission.sbatch_arguments.clone(),
        working_dir: work_dir,
        run_as: None,
    };
    scheduler.submit(request, &username).await
}

/// Join a job script file name onto the working directory.
///
/// Only plain file names are accepted.
fn file_path(work_dir: &Utf8Path, filename: &str) -> Result<Utf8PathBuf, AgentError> {
    let mut components = Utf8Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Utf8Component::Normal(name)), None) => Ok(work_dir.join(name)),
        _ => Err(AgentError::UnsafeFilename(filename.to_string())),
    }
}

/// Whether the user already picked a job name.
fn names_job(sbatch_args: &[String]) -> bool {
    sbatch_args
        .iter()
        .any(|a| a == "-J" || a.starts_with("--job-name") || (a.starts_with("-J") && a.len() > 2))
}
