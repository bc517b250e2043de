//! Configured entry point to the SLURM command-line tools.

use crate::sacct::{self, SacctError};
use crate::sbatch::{self, SbatchError, SubmitRequest};
use crate::scontrol::{self, ScontrolError};
use crate::types::SlurmJob;
use camino::Utf8PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlurmError {
    #[error(transparent)]
    Sbatch(#[from] SbatchError),
    #[error(transparent)]
    Scontrol(#[from] ScontrolError),
    #[error(transparent)]
    Sacct(#[from] SacctError),
}

/// Paths and limits for talking to SLURM.
#[derive(Debug, Clone)]
pub struct SlurmClient {
    sbatch: Utf8PathBuf,
    scontrol: Utf8PathBuf,
    sacct: Utf8PathBuf,
    timeout: Duration,
    current_user: Option<String>,
}

impl SlurmClient {
    pub fn new(
        sbatch: Utf8PathBuf,
        scontrol: Utf8PathBuf,
        sacct: Utf8PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            sbatch,
            scontrol,
            sacct,
            timeout,
            current_user: std::env::var("USER").ok(),
        }
    }

    /// Submit a batch script.
    ///
    /// `submitter` is the local account the job belongs to; sudo is only
    /// used when it differs from the account the agent runs as.
    pub async fn submit(
        &self,
        mut request: SubmitRequest,
        submitter: &str,
    ) -> Result<u64, SlurmError> {
        request.run_as = if self.current_user.as_deref() == Some(submitter) {
            None
        } else {
            Some(submitter.to_string())
        };
        Ok(sbatch::submit(&self.sbatch, &request, self.timeout).await?)
    }

    /// Look a job up, falling back to accounting once the controller has purged it.
    ///
    /// Returns None when neither source knows the job.
    pub async fn job(&self, job_id: u64) -> Result<Option<SlurmJob>, SlurmError> {
        if let Some(job) = scontrol::show_job(&self.scontrol, job_id, self.timeout).await? {
            return Ok(Some(job));
        }

        tracing::debug!(job_id, "scontrol has no record, trying sacct");
        Ok(sacct::query_job(&self.sacct, job_id, self.timeout).await?)
    }
}
