//! SLURM integration for the Jobbergate agent.
//!
//! Submit jobs with sbatch and follow them with scontrol and sacct.

pub mod client;
pub mod sacct;
pub mod sbatch;
pub mod scontrol;
pub mod types;

pub use client::{SlurmClient, SlurmError};
pub use sacct::SacctError;
pub use sbatch::{SbatchError, SubmitRequest};
pub use scontrol::ScontrolError;
pub use types::{SlurmJob, SlurmJobState};
