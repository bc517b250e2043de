//! Submit batch scripts via sbatch.

use camino::{Utf8Path, Utf8PathBuf};
use jobbergate_parsers::{CommandError, run_command};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum SbatchError {
    #[error("sbatch rejected the job: {0}")]
    Rejected(String),
    #[error("Failed to execute sbatch: {0}")]
    ExecutionError(String),
    #[error("Failed to parse sbatch output: {0:?}")]
    ParseError(String),
}

impl From<CommandError> for SbatchError {
    fn from(e: CommandError) -> Self {
        match e.stderr() {
            Some(stderr) => Self::Rejected(stderr.to_string()),
            None => Self::ExecutionError(e.to_string()),
        }
    }
}

/// A batch script ready to be handed to sbatch.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Entrypoint script
    pub script: Utf8PathBuf,
    /// Directory sbatch runs in; becomes the job's working directory
    pub working_dir: Utf8PathBuf,
    /// Extra sbatch arguments, passed before the script
    pub sbatch_args: Vec<String>,
    /// Job name override
    pub job_name: Option<String>,
    /// Submit on behalf of this user (through sudo)
    pub run_as: Option<String>,
}

/// Build the sbatch invocation for a request.
pub(crate) fn build_command(sbatch: &Utf8Path, request: &SubmitRequest) -> Command {
    let mut cmd = match &request.run_as {
        Some(user) => {
            let mut cmd = Command::new("sudo");
            cmd.args(["-n", "-u", user.as_str(), sbatch.as_str()]);
            cmd
        }
        None => Command::new(sbatch.as_std_path()),
    };

    cmd.arg("--parsable");
    if let Some(name) = &request.job_name {
        cmd.arg(format!("--job-name={}", name));
    }
    cmd.args(&request.sbatch_args);
    cmd.arg(request.script.as_str());
    cmd.current_dir(request.working_dir.as_std_path());
    cmd
}

/// Parse `sbatch --parsable` output: `<job_id>` or `<job_id>;<cluster>`.
pub(crate) fn parse_sbatch_output(stdout: &str) -> Result<u64, SbatchError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .ok_or_else(|| SbatchError::ParseError(stdout.to_string()))?;

    let id = line.split(';').next().unwrap_or(line);
    id.parse()
        .map_err(|_| SbatchError::ParseError(stdout.to_string()))
}

/// Submit a batch script, returning the SLURM job ID.
pub async fn submit(
    sbatch: &Utf8Path,
    request: &SubmitRequest,
    timeout: Duration,
) -> Result<u64, SbatchError> {
    let mut cmd = build_command(sbatch, request);
    let stdout = run_command(&mut cmd, "sbatch", timeout).await?;
    let job_id = parse_sbatch_output(&stdout)?;

    tracing::debug!(job_id, script = %request.script, "sbatch accepted job");
    Ok(job_id)
}
