//! Jobbergate agent - submits and tracks Jobbergate jobs on a SLURM cluster.

mod errors;
mod heartbeat;
mod logging;
mod ports;
mod scheduler;
mod self_update;
mod submit;
mod update;
mod user_mapper;

#[cfg(test)]
mod testing;

use camino::Utf8PathBuf;
use clap::Parser;
use jobbergate_cli::{Args, Settings};
use jobbergate_client::{JobbergateClient, OidcCredentials, TokenCache, TokenManager};
use jobbergate_slurm::SlurmClient;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{Agent, Exit};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(&args.log_level);

    let settings = Settings::from_args(
        args,
        std::env::var("USER").ok(),
        std::env::var("HOME").ok().map(Utf8PathBuf::from),
    )
    .into_diagnostic()?;

    let agent = build_agent(settings.clone())?;
    tracing::info!(
        "jobbergate-agent {} talking to {}",
        env!("CARGO_PKG_VERSION"),
        settings.base_api_url
    );

    if settings.once {
        agent.jobs_pass().await;
        return Ok(());
    }

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(token.clone()));

    match agent.run(token).await {
        Exit::Shutdown => {
            tracing::info!("shut down");
            Ok(())
        }
        Exit::Reload => restart(),
    }
}

fn build_agent(settings: Settings) -> Result<Agent> {
    let credentials = OidcCredentials {
        base_url: settings.oidc_base_url.clone(),
        client_id: settings.oidc_client_id.clone(),
        client_secret: settings.oidc_client_secret.clone(),
        audience: settings.oidc_audience.clone(),
    };
    let cache = settings.cache_dir.as_deref().map(TokenCache::new);
    let tokens = TokenManager::new(credentials, cache);

    let api = JobbergateClient::new(
        &settings.base_api_url,
        tokens,
        settings.page_size,
        settings.http_timeout,
    )
    .into_diagnostic()?;
    let slurm = SlurmClient::new(
        settings.sbatch_path.clone(),
        settings.scontrol_path.clone(),
        settings.sacct_path.clone(),
        settings.command_timeout,
    );

    Ok(Agent::new(Arc::new(api), Arc::new(slurm), settings))
}

async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    tracing::info!("shutdown requested");
    token.cancel();
}

/// Replace this process with the freshly installed binary.
#[cfg(unix)]
fn restart() -> Result<()> {
    use std::os::unix::process::CommandExt;

    let mut argv = std::env::args_os();
    let program = argv.next().ok_or_else(|| miette::miette!("no argv[0] to restart"))?;
    tracing::info!("restarting {}", program.to_string_lossy());
    let err = std::process::Command::new(program).args(argv).exec();
    Err(err).into_diagnostic()
}

#[cfg(not(unix))]
fn restart() -> Result<()> {
    Err(miette::miette!(
        "upgrade installed; restart jobbergate-agent to use it"
    ))
}
