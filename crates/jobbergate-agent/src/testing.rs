//! In-memory stand-ins for the API and SLURM.

use async_trait::async_trait;
use jobbergate_client::ClientError;
use jobbergate_slurm::{SbatchError, SlurmError, SlurmJob, SubmitRequest};
use jobbergate_state::{
    ActiveJobSubmission, PendingJobSubmission, RejectedReport, StatusReport, SubmittedReport,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::errors::AgentError;
use crate::ports::{JobScheduler, SubmissionApi};

pub fn api_down() -> AgentError {
    ClientError::Status {
        url: "http://jobbergate.test".to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
    .into()
}

#[derive(Default)]
pub struct FakeApi {
    pub pending: Vec<PendingJobSubmission>,
    pub active: Vec<ActiveJobSubmission>,
    pub files: HashMap<(i64, String), Vec<u8>>,
    pub version: Option<String>,
    pub listing_down: bool,
    pub reports_down_for: HashSet<i64>,
    pub submitted: Mutex<Vec<SubmittedReport>>,
    pub rejected: Mutex<Vec<RejectedReport>>,
    pub updates: Mutex<Vec<(i64, StatusReport)>>,
    pub heartbeats: Mutex<Vec<Duration>>,
}

impl FakeApi {
    fn report(&self, id: i64) -> Result<(), AgentError> {
        if self.reports_down_for.contains(&id) {
            Err(api_down())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubmissionApi for FakeApi {
    async fn pending_submissions(&self) -> Result<Vec<PendingJobSubmission>, AgentError> {
        if self.listing_down {
            return Err(api_down());
        }
        Ok(self.pending.clone())
    }

    async fn active_submissions(&self) -> Result<Vec<ActiveJobSubmission>, AgentError> {
        if self.listing_down {
            return Err(api_down());
        }
        Ok(self.active.clone())
    }

    async fn download_file(
        &self,
        job_script_id: i64,
        filename: &str,
    ) -> Result<Vec<u8>, AgentError> {
        self.files
            .get(&(job_script_id, filename.to_string()))
            .cloned()
            .ok_or_else(api_down)
    }

    async fn mark_submitted(&self, report: &SubmittedReport) -> Result<(), AgentError> {
        self.report(report.id)?;
        self.submitted.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn mark_rejected(&self, report: &RejectedReport) -> Result<(), AgentError> {
        self.report(report.id)?;
        self.rejected.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn update_status(&self, id: i64, report: &StatusReport) -> Result<(), AgentError> {
        self.report(id)?;
        self.updates.lock().unwrap().push((id, report.clone()));
        Ok(())
    }

    async fn report_cluster_status(&self, interval: Duration) -> Result<(), AgentError> {
        self.heartbeats.lock().unwrap().push(interval);
        Ok(())
    }

    async fn api_version(&self) -> Result<String, AgentError> {
        self.version.clone().ok_or_else(api_down)
    }
}

pub struct FakeScheduler {
    pub next_id: AtomicU64,
    /// Entrypoint file names sbatch refuses
    pub rejects: HashSet<String>,
    pub jobs: HashMap<u64, SlurmJob>,
    /// Job ids whose lookup errors out
    pub broken: HashSet<u64>,
    pub submissions: Mutex<Vec<(SubmitRequest, String)>>,
}

impl Default for FakeScheduler {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            rejects: HashSet::new(),
            jobs: HashMap::new(),
            broken: HashSet::new(),
            submissions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl JobScheduler for FakeScheduler {
    async fn submit(&self, request: SubmitRequest, submitter: &str) -> Result<u64, AgentError> {
        let name = request.script.file_name().unwrap_or_default().to_string();
        if self.rejects.contains(&name) {
            return Err(SlurmError::from(SbatchError::Rejected(
                "sbatch: error: Batch job submission failed: Invalid partition".to_string(),
            ))
            .into());
        }
        self.submissions
            .lock()
            .unwrap()
            .push((request, submitter.to_string()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn job(&self, job_id: u64) -> Result<Option<SlurmJob>, AgentError> {
        if self.broken.contains(&job_id) {
            return Err(SlurmError::from(jobbergate_slurm::ScontrolError::ExecutionError(
                "controller down".to_string(),
            ))
            .into());
        }
        Ok(self.jobs.get(&job_id).cloned())
    }
}
