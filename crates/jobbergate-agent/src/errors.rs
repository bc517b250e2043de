use camino::Utf8PathBuf;
use jobbergate_client::ClientError;
use jobbergate_slurm::SlurmError;
use jobbergate_state::ModelError;
use thiserror::Error;

use crate::user_mapper::MappingError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("API error: {0}")]
    Api(#[from] ClientError),
    #[error("SLURM error: {0}")]
    Slurm(#[from] SlurmError),
    #[error("Invalid job script: {0}")]
    JobScript(#[from] ModelError),
    #[error("User mapping failed: {0}")]
    UserMapping(#[from] MappingError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("Refusing job script file name {0:?}")]
    UnsafeFilename(String),
    #[error("Cannot parse version {0:?}")]
    Version(String),
    #[error("Upgrade failed: {0}")]
    Upgrade(String),
}

impl AgentError {
    pub fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
