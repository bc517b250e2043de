//! Job submission state for the Jobbergate agent.
//!
//! Wire models shared with the Jobbergate API, the platform status enum,
//! and the rules that turn SLURM observations into status reports.

pub mod models;
pub mod reconcile;
pub mod types;

pub use models::{
    ActiveJobSubmission, FileType, JobScript, JobScriptFile, ModelError, Page,
    PendingJobSubmission, RejectedReport, StatusReport, SubmittedReport,
};
pub use reconcile::{NOT_FOUND_REASON, reconcile};
pub use types::{JobSubmissionStatus, ToSubmissionStatus};
