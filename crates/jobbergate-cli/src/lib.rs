//! Command-line and environment configuration for the Jobbergate agent.

pub mod settings;

pub use settings::{Settings, SettingsError, UserMapping};

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// How job owners are mapped to local accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MapperKind {
    /// Every job runs as one local account
    SingleUser,
    /// Use the local part of the owner's email address
    EmailLocalPart,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "jobbergate-agent")]
#[command(about = "Submit and track Jobbergate job submissions on a SLURM cluster")]
#[command(version)]
pub struct Args {
    /// Base URL of the Jobbergate API
    #[arg(
        long,
        env = "JOBBERGATE_AGENT_BASE_API_URL",
        default_value = "https://apis.omnivector.solutions"
    )]
    pub base_api_url: String,

    /// Base URL of the OIDC realm issuing agent tokens
    #[arg(long, env = "JOBBERGATE_AGENT_OIDC_BASE_URL")]
    pub oidc_base_url: String,

    /// OIDC client id of this agent
    #[arg(long, env = "JOBBERGATE_AGENT_OIDC_CLIENT_ID")]
    pub oidc_client_id: String,

    /// OIDC client secret of this agent
    #[arg(long, env = "JOBBERGATE_AGENT_OIDC_CLIENT_SECRET", hide_env_values = true)]
    pub oidc_client_secret: String,

    /// Audience requested for agent tokens
    #[arg(
        long,
        env = "JOBBERGATE_AGENT_OIDC_AUDIENCE",
        default_value = "https://apis.omnivector.solutions"
    )]
    pub oidc_audience: String,

    /// Directory for the token cache (defaults to ~/.cache/jobbergate-agent)
    #[arg(long, env = "JOBBERGATE_AGENT_CACHE_DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// sbatch executable
    #[arg(long, env = "JOBBERGATE_AGENT_SBATCH_PATH", default_value = "/usr/bin/sbatch")]
    pub sbatch_path: Utf8PathBuf,

    /// scontrol executable
    #[arg(long, env = "JOBBERGATE_AGENT_SCONTROL_PATH", default_value = "/usr/bin/scontrol")]
    pub scontrol_path: Utf8PathBuf,

    /// sacct executable
    #[arg(long, env = "JOBBERGATE_AGENT_SACCT_PATH", default_value = "/usr/bin/sacct")]
    pub sacct_path: Utf8PathBuf,

    /// Working directory for submissions that do not name one
    #[arg(long, env = "JOBBERGATE_AGENT_DEFAULT_SLURM_WORK_DIR", default_value = "/tmp")]
    pub default_slurm_work_dir: Utf8PathBuf,

    /// How job owners map to local accounts
    #[arg(
        long,
        env = "JOBBERGATE_AGENT_USER_MAPPER",
        value_enum,
        default_value = "single-user"
    )]
    pub user_mapper: MapperKind,

    /// Account used by the single-user mapper (defaults to $USER)
    #[arg(long, env = "JOBBERGATE_AGENT_SINGLE_USER_SUBMITTER")]
    pub single_user_submitter: Option<String>,

    /// Seconds between job submission/status passes
    #[arg(long, env = "JOBBERGATE_AGENT_TASK_JOBS_INTERVAL_SECONDS", default_value = "60")]
    pub jobs_interval: u64,

    /// Seconds between cluster status reports
    #[arg(
        long,
        env = "JOBBERGATE_AGENT_TASK_CLUSTER_STATUS_INTERVAL_SECONDS",
        default_value = "60"
    )]
    pub cluster_status_interval: u64,

    /// Seconds between self-update checks (disabled when unset)
    #[arg(long, env = "JOBBERGATE_AGENT_TASK_SELF_UPDATE_INTERVAL_SECONDS")]
    pub self_update_interval: Option<u64>,

    /// Command that installs another agent version; `{version}` is replaced
    #[arg(
        long,
        env = "JOBBERGATE_AGENT_UPGRADE_COMMAND",
        default_value = "cargo install --locked jobbergate-agent --version {version}"
    )]
    pub upgrade_command: String,

    /// Items requested per page from the API
    #[arg(long, env = "JOBBERGATE_AGENT_PAGE_SIZE", default_value = "100")]
    pub page_size: u64,

    /// Seconds before a SLURM command is killed
    #[arg(long, env = "JOBBERGATE_AGENT_COMMAND_TIMEOUT_SECONDS", default_value = "60")]
    pub command_timeout: u64,

    /// Seconds before an API request is abandoned
    #[arg(long, env = "JOBBERGATE_AGENT_HTTP_TIMEOUT_SECONDS", default_value = "30")]
    pub http_timeout: u64,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, env = "JOBBERGATE_AGENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Run one submission/status pass and exit
    #[arg(long)]
    pub once: bool,
}
