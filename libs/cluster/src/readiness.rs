//! Cluster readiness polling.
//!
//! `Provisioning -> Active` with `Error` and `TimedOut` as absorbing states.
//! The status is fetched every [`CLUSTER_POLL_INTERVAL`]; the timeout is
//! given in minutes and turned into a tick budget of `minutes * 6`.

use ostf_poll::{TickBudget, CLUSTER_POLL_INTERVAL};
use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::model::{ClusterState, ClusterStatus};
use crate::orchestrator::Orchestrator;

/// Wait for a freshly created cluster to become Active.
///
/// Returns the Active snapshot. An Error status fails immediately; it is
/// never waited out.
pub async fn await_cluster_ready(
    orchestrator: &dyn Orchestrator,
    cluster_id: &str,
    timeout_minutes: u64,
) -> Result<ClusterStatus, ClusterError> {
    let mut attempt = TickBudget::from_minutes(timeout_minutes, CLUSTER_POLL_INTERVAL).start();

    debug!(
        cluster_id,
        timeout_minutes,
        max_ticks = attempt.budget().max_ticks(),
        "Waiting for cluster to become Active"
    );

    while attempt.next_tick().await {
        let status = orchestrator.get_cluster(cluster_id).await?;
        info!(
            cluster_id,
            tick = attempt.ticks(),
            elapsed_secs = attempt.elapsed().as_secs(),
            status = %status.status,
            "Cluster status"
        );

        match status.status {
            ClusterState::Active => return Ok(status),
            ClusterState::Error => {
                let payload = status.payload();
                warn!(cluster_id, payload = %payload, "Cluster entered Error state");
                return Err(ClusterError::ClusterFailed {
                    cluster_id: cluster_id.to_string(),
                    ticks: attempt.ticks(),
                    elapsed: attempt.elapsed(),
                    payload,
                });
            }
            ClusterState::Other(ref state) => attempt.observe(state.as_str()),
        }
    }

    let last_status = attempt.last_status().unwrap_or("unknown").to_string();
    warn!(
        cluster_id,
        timeout_minutes,
        last_status = %last_status,
        "Cluster did not become Active in time"
    );

    Err(ClusterError::TimedOut {
        cluster_id: cluster_id.to_string(),
        timeout_minutes,
        ticks: attempt.ticks(),
        elapsed: attempt.elapsed(),
        last_status,
    })
}
