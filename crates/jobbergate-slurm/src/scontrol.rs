//! Query a single job via `scontrol show job`.

use crate::types::{SlurmJob, SlurmJobState, select_job};
use camino::Utf8Path;
use jobbergate_parsers::{
    non_empty_string, parse_duration, parse_exit_code, parse_exit_signal,
    parse_key_values, parse_slurm_timestamp, run_command,
};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum ScontrolError {
    #[error("Failed to execute scontrol: {0}")]
    ExecutionError(String),
    #[error("Failed to parse scontrol output: {0}")]
    ParseError(String),
}

/// scontrol prints this once a job has aged out of the controller.
const INVALID_JOB_ID: &str = "Invalid job id specified";

/// Parse one `--oneliner` record.
pub(crate) fn parse_scontrol_record(line: &str) -> Result<SlurmJob, ScontrolError> {
    let info = parse_key_values(line);

    let job_id = info
        .get("JobId")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| ScontrolError::ParseError(format!("missing JobId: {}", line)))?;
    let state = info
        .get("JobState")
        .map(|s| SlurmJobState::parse(s))
        .ok_or_else(|| ScontrolError::ParseError(format!("missing JobState: {}", line)))?;

    let field = |key: &str| info.get(key).and_then(|v| non_empty_string(v));
    let exit = info.get("ExitCode");

    Ok(SlurmJob {
        job_id,
        name: info.get("JobName").cloned().unwrap_or_default(),
        state,
        state_reason: field("Reason"),
        exit_code: exit.map(|e| parse_exit_code(e)),
        exit_signal: exit.and_then(|e| parse_exit_signal(e)),
        partition: field("Partition"),
        submit_time: info.get("SubmitTime").and_then(|t| parse_slurm_timestamp(t)),
        start_time: info.get("StartTime").and_then(|t| parse_slurm_timestamp(t)),
        end_time: info.get("EndTime").and_then(|t| parse_slurm_timestamp(t)),
        nodelist: field("NodeList"),
        time_limit: info.get("TimeLimit").and_then(|t| parse_duration(t)),
        info,
    })
}

/// Show a job. Returns None when the controller no longer knows it.
pub async fn show_job(
    scontrol: &Utf8Path,
    job_id: u64,
    timeout: Duration,
) -> Result<Option<SlurmJob>, ScontrolError> {
    let mut cmd = Command::new(scontrol.as_std_path());
    cmd.args(["show", "job", &job_id.to_string(), "--oneliner"]);

    let stdout = match run_command(&mut cmd, "scontrol", timeout).await {
        Ok(stdout) => stdout,
        Err(e) if e.stderr().is_some_and(|s| s.contains(INVALID_JOB_ID)) => {
            return Ok(None);
        }
        Err(e) => return Err(ScontrolError::ExecutionError(e.to_string())),
    };

    let records = stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_scontrol_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(select_job(records, job_id))
}
