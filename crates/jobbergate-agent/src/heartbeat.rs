//! Cluster liveness reports.

use std::time::Duration;

use crate::errors::AgentError;
use crate::ports::SubmissionApi;

/// Tell the API the cluster is alive and when to expect the next report.
pub async fn report_alive<A>(api: &A, interval: Duration) -> Result<(), AgentError>
where
    A: SubmissionApi + ?Sized,
{
    api.report_cluster_status(interval).await?;
    tracing::debug!("cluster status reported, next in {}s", interval.as_secs());
    Ok(())
}
