//! Query SLURM job accounting via sacct.
//!
//! scontrol forgets finished jobs after `MinJobAge`; sacct still has them.

use crate::types::{SlurmJob, SlurmJobState, select_job};
use camino::Utf8Path;
use jobbergate_parsers::{
    non_empty_string, parse_duration, parse_exit_code, parse_exit_signal, parse_slurm_timestamp,
    run_command, split_delimited,
};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum SacctError {
    #[error("Failed to execute sacct: {0}")]
    ExecutionError(String),
    #[error("Failed to parse sacct output: {0}")]
    ParseError(String),
}

/// sacct output format (--parsable2 uses | delimiter)
///
/// `JobID` comes last; for array tasks it reads `<array>_<task>`.
const SACCT_FIELDS: [&str; 12] = [
    "JobIDRaw",
    "JobName",
    "State",
    "Partition",
    "Submit",
    "Start",
    "End",
    "NodeList",
    "Timelimit",
    "ExitCode",
    "Reason",
    "JobID",
];

/// Parse a single line of sacct output.
pub(crate) fn parse_sacct_line(line: &str) -> Result<SlurmJob, SacctError> {
    let fields = split_delimited(line, SACCT_FIELDS.len()).map_err(SacctError::ParseError)?;

    let job_id = fields[0]
        .parse()
        .map_err(|_| SacctError::ParseError(format!("bad job id: {}", fields[0])))?;

    let info: BTreeMap<String, String> = SACCT_FIELDS
        .iter()
        .zip(&fields)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Ok(SlurmJob {
        job_id,
        name: fields[1].to_string(),
        state: SlurmJobState::parse(fields[2]),
        state_reason: non_empty_string(fields[10]),
        exit_code: Some(parse_exit_code(fields[9])),
        exit_signal: parse_exit_signal(fields[9]),
        partition: non_empty_string(fields[3]),
        submit_time: parse_slurm_timestamp(fields[4]),
        start_time: parse_slurm_timestamp(fields[5]),
        end_time: parse_slurm_timestamp(fields[6]),
        nodelist: non_empty_string(fields[7]),
        time_limit: parse_duration(fields[8]),
        info,
    })
}

/// Query the accounting record of a single job.
pub async fn query_job(
    sacct: &Utf8Path,
    job_id: u64,
    timeout: Duration,
) -> Result<Option<SlurmJob>, SacctError> {
    let mut cmd = Command::new(sacct.as_std_path());
    cmd.args([
        "-j",
        &job_id.to_string(),
        "-X",
        "--parsable2",
        "--noheader",
        "--format",
        &SACCT_FIELDS.join(","),
    ]);

    let stdout = run_command(&mut cmd, "sacct", timeout)
        .await
        .map_err(|e| SacctError::ExecutionError(e.to_string()))?;

    let mut records = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_sacct_line(line) {
            Ok(job) => records.push(job),
            Err(e) => tracing::warn!("Failed to parse sacct line: {}", e),
        }
    }

    Ok(select_job(records, job_id))
}
