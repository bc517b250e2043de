//! Runs the agent's periodic tasks until shutdown.

use jobbergate_cli::Settings;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::heartbeat::report_alive;
use crate::ports::{JobScheduler, SubmissionApi};
use crate::self_update::{UpdateCheck, Version, check_version, upgrade};
use crate::submit::{SubmitContext, submit_pending};
use crate::update::update_active;

/// Why the scheduler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Shutdown,
    /// A new version was installed; the process should restart itself
    Reload,
}

pub struct Agent {
    api: Arc<dyn SubmissionApi>,
    scheduler: Arc<dyn JobScheduler>,
    settings: Settings,
}

impl Agent {
    pub fn new(
        api: Arc<dyn SubmissionApi>,
        scheduler: Arc<dyn JobScheduler>,
        settings: Settings,
    ) -> Self {
        Self {
            api,
            scheduler,
            settings,
        }
    }

    /// Submit pending jobs, then refresh the status of active ones.
    pub async fn jobs_pass(&self) {
        let ctx = SubmitContext {
            user_mapping: &self.settings.user_mapping,
            default_work_dir: &self.settings.default_slurm_work_dir,
        };
        match submit_pending(self.api.as_ref(), self.scheduler.as_ref(), ctx).await {
            Ok(summary) if summary.submitted + summary.rejected + summary.unreported > 0 => {
                tracing::info!(
                    "submitted {}, rejected {}, unreported {}",
                    summary.submitted,
                    summary.rejected,
                    summary.unreported
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Error submitting pending jobs: {}", e),
        }

        match update_active(self.api.as_ref(), self.scheduler.as_ref()).await {
            Ok(summary) => tracing::debug!(
                "updated {}, unchanged {}, skipped {}",
                summary.updated,
                summary.unchanged,
                summary.skipped
            ),
            Err(e) => tracing::error!("Error updating active jobs: {}", e),
        }
    }

    async fn heartbeat(&self) {
        if let Err(e) = report_alive(self.api.as_ref(), self.settings.cluster_status_interval).await
        {
            tracing::error!("Error reporting cluster status: {}", e);
        }
    }

    /// A newer version to install, if any.
    async fn pending_upgrade(&self) -> Option<Version> {
        match check_version(self.api.as_ref(), env!("CARGO_PKG_VERSION")).await {
            Ok(UpdateCheck::Available(version)) => Some(version),
            Ok(_) => None,
            Err(e) => {
                tracing::error!("Error checking for updates: {}", e);
                None
            }
        }
    }

    /// Run every task on its own interval until `token` is cancelled.
    ///
    /// Passes still in flight at shutdown are dropped, not awaited. When a
    /// newer version is available the tasks are stopped first and the
    /// upgrade runs afterwards; if it fails, the tasks start again and the
    /// next version check waits a full interval.
    pub async fn run(self, token: CancellationToken) -> Exit {
        let agent = Arc::new(self);
        let mut update_start = Instant::now();

        loop {
            let Some(version) = agent.clone().run_tasks(&token, update_start).await else {
                return Exit::Shutdown;
            };

            tracing::info!("scheduler stopped, upgrading to {}", version);
            let result = tokio::select! {
                _ = token.cancelled() => return Exit::Shutdown,
                result = upgrade(&agent.settings.upgrade_command, version) => result,
            };
            match result {
                Ok(()) => {
                    tracing::info!("upgraded to {}, restarting", version);
                    return Exit::Reload;
                }
                Err(e) => {
                    tracing::error!("{}; resuming", e);
                    if let Some(period) = agent.settings.self_update_interval {
                        update_start = Instant::now() + period;
                    }
                }
            }
        }
    }

    /// Run the tasks until shutdown or until an upgrade is due.
    ///
    /// Returns the version to upgrade to, or None on shutdown.
    async fn run_tasks(
        self: Arc<Self>,
        shutdown: &CancellationToken,
        update_start: Instant,
    ) -> Option<Version> {
        let stop = shutdown.child_token();
        let wanted = Arc::new(Mutex::new(None));
        let mut tasks = JoinSet::new();

        let jobs = self.clone();
        tasks.spawn(every(
            Instant::now(),
            self.settings.jobs_interval,
            stop.clone(),
            move || {
                let agent = jobs.clone();
                async move { agent.jobs_pass().await }
            },
        ));

        let heartbeat = self.clone();
        tasks.spawn(every(
            Instant::now(),
            self.settings.cluster_status_interval,
            stop.clone(),
            move || {
                let agent = heartbeat.clone();
                async move { agent.heartbeat().await }
            },
        ));

        if let Some(period) = self.settings.self_update_interval {
            let updater = self.clone();
            let wanted = wanted.clone();
            let stop_all = stop.clone();
            tasks.spawn(every(update_start, period, stop.clone(), move || {
                let agent = updater.clone();
                let wanted = wanted.clone();
                let stop_all = stop_all.clone();
                async move {
                    if let Some(version) = agent.pending_upgrade().await {
                        *wanted.lock().await = Some(version);
                        stop_all.cancel();
                    }
                }
            }));
        }

        tokio::select! {
            _ = stop.cancelled() => {}
            Some(result) = tasks.join_next() => {
                if let Err(e) = result {
                    tracing::error!("agent task stopped: {}", e);
                }
            }
        }
        stop.cancel();
        tasks.shutdown().await;

        if shutdown.is_cancelled() {
            return None;
        }
        wanted.lock().await.take()
    }
}

/// Call `task` every `period` from `start`, skipping ticks missed while it ran.
async fn every<F, Fut>(start: Instant, period: Duration, token: CancellationToken, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = task() => {}
        }
    }
}
