//! Seams between the agent's tasks and the outside world.

use async_trait::async_trait;
use jobbergate_client::JobbergateClient;
use jobbergate_slurm::{SlurmClient, SlurmJob, SubmitRequest};
use jobbergate_state::{
    ActiveJobSubmission, PendingJobSubmission, RejectedReport, StatusReport, SubmittedReport,
};
use std::time::Duration;

use crate::errors::AgentError;

/// The Jobbergate API as seen by the agent.
#[async_trait]
pub trait SubmissionApi: Send + Sync {
    async fn pending_submissions(&self) -> Result<Vec<PendingJobSubmission>, AgentError>;
    async fn active_submissions(&self) -> Result<Vec<ActiveJobSubmission>, AgentError>;
    async fn download_file(
        &self,
        job_script_id: i64,
        filename: &str,
    ) -> Result<Vec<u8>, AgentError>;
    async fn mark_submitted(&self, report: &SubmittedReport) -> Result<(), AgentError>;
    async fn mark_rejected(&self, report: &RejectedReport) -> Result<(), AgentError>;
    async fn update_status(&self, id: i64, report: &StatusReport) -> Result<(), AgentError>;
    async fn report_cluster_status(&self, interval: Duration) -> Result<(), AgentError>;
    async fn api_version(&self) -> Result<String, AgentError>;
}

/// The local resource manager.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Submit a job on behalf of `submitter`, returning the scheduler job id.
    async fn submit(&self, request: SubmitRequest, submitter: &str) -> Result<u64, AgentError>;
    /// Current view of a job; None once the scheduler has no record of it.
    async fn job(&self, job_id: u64) -> Result<Option<SlurmJob>, AgentError>;
}

#[async_trait]
impl SubmissionApi for JobbergateClient {
    async fn pending_submissions(&self) -> Result<Vec<PendingJobSubmission>, AgentError> {
        Ok(JobbergateClient::pending_submissions(self).await?)
    }

    async fn active_submissions(&self) -> Result<Vec<ActiveJobSubmission>, AgentError> {
        Ok(JobbergateClient::active_submissions(self).await?)
    }

    async fn download_file(
        &self,
        job_script_id: i64,
        filename: &str,
    ) -> Result<Vec<u8>, AgentError> {
        Ok(JobbergateClient::download_file(self, job_script_id, filename).await?)
    }

    async fn mark_submitted(&self, report: &SubmittedReport) -> Result<(), AgentError> {
        Ok(JobbergateClient::mark_submitted(self, report).await?)
    }

    async fn mark_rejected(&self, report: &RejectedReport) -> Result<(), AgentError> {
        Ok(JobbergateClient::mark_rejected(self, report).await?)
    }

    async fn update_status(&self, id: i64, report: &StatusReport) -> Result<(), AgentError> {
        Ok(JobbergateClient::update_status(self, id, report).await?)
    }

    async fn report_cluster_status(&self, interval: Duration) -> Result<(), AgentError> {
        Ok(JobbergateClient::report_cluster_status(self, interval).await?)
    }

    async fn api_version(&self) -> Result<String, AgentError> {
        Ok(JobbergateClient::api_version(self).await?)
    }
}

#[async_trait]
impl JobScheduler for SlurmClient {
    async fn submit(&self, request: SubmitRequest, submitter: &str) -> Result<u64, AgentError> {
        Ok(SlurmClient::submit(self, request, submitter).await?)
    }

    async fn job(&self, job_id: u64) -> Result<Option<SlurmJob>, AgentError> {
        Ok(SlurmClient::job(self, job_id).await?)
    }
}
