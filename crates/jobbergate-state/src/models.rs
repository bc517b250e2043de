//! Wire models exchanged with the Jobbergate API.

use crate::types::JobSubmissionStatus;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("job script {0} has no entrypoint file")]
    MissingEntrypoint(i64),
    #[error("job script {0} has {1} entrypoint files")]
    MultipleEntrypoints(i64, usize),
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub pages: Option<u64>,
}

impl<T> Page<T> {
    /// Whether there is nothing after this page.
    pub fn is_last(&self) -> bool {
        if self.items.is_empty() {
            return true;
        }
        match (self.page, self.pages) {
            (Some(page), Some(pages)) => page >= pages,
            _ => true,
        }
    }
}

/// Role of a file inside a job script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Entrypoint,
    Support,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobScriptFile {
    /// Owning job script
    pub parent_id: i64,
    pub filename: String,
    pub file_type: FileType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobScript {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub files: Vec<JobScriptFile>,
}

impl JobScript {
    /// The file sbatch is pointed at. Exactly one must exist.
    pub fn entrypoint(&self) -> Result<&JobScriptFile, ModelError> {
        let mut entrypoints = self
            .files
            .iter()
            .filter(|f| f.file_type == FileType::Entrypoint);

        match (entrypoints.next(), entrypoints.count()) {
            (Some(file), 0) => Ok(file),
            (None, _) => Err(ModelError::MissingEntrypoint(self.id)),
            (Some(_), more) => Err(ModelError::MultipleEntrypoints(self.id, more + 1)),
        }
    }
}

/// A submission waiting to be handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJobSubmission {
    pub id: i64,
    pub name: String,
    pub owner_email: String,
    #[serde(default)]
    pub execution_directory: Option<Utf8PathBuf>,
    #[serde(default)]
    pub sbatch_arguments: Vec<String>,
    pub job_script: JobScript,
}

/// A submission the scheduler is (or was) running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveJobSubmission {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub slurm_job_id: u64,
    /// SLURM state from the previous report
    #[serde(default)]
    pub slurm_job_state: Option<String>,
}

/// Sent once sbatch accepted a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedReport {
    pub id: i64,
    pub slurm_job_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slurm_job_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slurm_job_info: Option<String>,
}

/// Sent when a submission could not be handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedReport {
    pub id: i64,
    pub report_message: String,
}

/// Status change of an active submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: JobSubmissionStatus,
    pub slurm_job_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slurm_job_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slurm_job_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slurm_job_state_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(types: &[FileType]) -> JobScript {
        JobScript {
            id: 7,
            name: "demo".to_string(),
            files: types
                .iter()
                .enumerate()
                .map(|(i, t)| JobScriptFile {
                    parent_id: 7,
                    filename: format!("file{i}.sh"),
                    file_type: *t,
                })
                .collect(),
        }
    }

    #[test]
    fn test_entrypoint_selection() {
        let s = script(&[FileType::Support, FileType::Entrypoint]);
        assert_eq!(s.entrypoint().unwrap().filename, "file1.sh");

        let s = script(&[FileType::Support]);
        assert_eq!(s.entrypoint(), Err(ModelError::MissingEntrypoint(7)));

        let s = script(&[FileType::Entrypoint, FileType::Entrypoint]);
        assert_eq!(s.entrypoint(), Err(ModelError::MultipleEntrypoints(7, 2)));
    }

    #[test]
    fn test_page_is_last() {
        let page: Page<i32> = serde_json::from_value(json!({
            "items": [1, 2], "total": 4, "page": 1, "size": 2, "pages": 2
        }))
        .unwrap();
        assert!(!page.is_last());

        let page: Page<i32> = serde_json::from_value(json!({
            "items": [3, 4], "total": 4, "page": 2, "size": 2, "pages": 2
        }))
        .unwrap();
        assert!(page.is_last());

        let page: Page<i32> = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert!(page.is_last());
    }

    #[test]
    fn test_pending_submission_from_api_json() {
        let pending: PendingJobSubmission = serde_json::from_value(json!({
            "id": 3,
            "name": "hello",
            "owner_email": "alice@example.org",
            "execution_directory": null,
            "job_script": {
                "id": 9,
                "name": "hello-script",
                "files": [
                    {"parent_id": 9, "filename": "run.sh", "file_type": "ENTRYPOINT"}
                ]
            }
        }))
        .unwrap();
        assert!(pending.execution_directory.is_none());
        assert!(pending.sbatch_arguments.is_empty());
        assert_eq!(pending.job_script.entrypoint().unwrap().filename, "run.sh");
    }

    #[test]
    fn test_status_report_omits_empty_fields() {
        let report = StatusReport {
            status: JobSubmissionStatus::Completed,
            slurm_job_id: 11,
            slurm_job_state: Some("COMPLETED".to_string()),
            slurm_job_info: None,
            slurm_job_state_reason: None,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"status": "COMPLETED", "slurm_job_id": 11, "slurm_job_state": "COMPLETED"})
        );
    }
}
