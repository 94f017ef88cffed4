//! Worker activation convergence.
//!
//! After the ports are open the Hadoop daemons still need time to register
//! with the masters. Each tick asks the namenode host for the number of
//! active task trackers and live datanodes; both must match the topology
//! exactly.

use ostf_poll::{TickBudget, DEFAULT_WORKER_ATTEMPTS, WORKER_POLL_INTERVAL};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ClusterError;
use crate::model::NodeInfo;
use crate::shell::RemoteShell;
use crate::variant::PluginVariant;

/// Printed by the install command once the key file is written and non-empty.
pub const KEY_INSTALLED_MARKER: &str = "OSTF_KEY_OK";

/// Budget for worker activation: 100 queries, 3s apart.
///
/// No sleep follows the last query, so an exhausted budget spans 297s.
pub fn default_worker_budget() -> TickBudget {
    TickBudget::fixed(DEFAULT_WORKER_ATTEMPTS, WORKER_POLL_INTERVAL)
}

/// Private key material installed on the controller for the duration of
/// the worker queries.
#[derive(Debug)]
pub struct RemoteKeyFile {
    path: String,
}

impl RemoteKeyFile {
    /// Write `private_key` to a fresh path readable only by its owner.
    ///
    /// The command must echo [`KEY_INSTALLED_MARKER`]; otherwise whatever was
    /// written is removed and `KeyInstall` is returned.
    pub async fn install(shell: &dyn RemoteShell, private_key: &str) -> Result<Self, ClusterError> {
        let path = format!("/tmp/ostf-sahara-{}.pem", Uuid::new_v4().simple());
        let command = format!(
            "umask 077 && cat > {path} <<'OSTF_KEY_EOF'\n{}\nOSTF_KEY_EOF\n\
             chmod 600 {path} && test -s {path} && echo {KEY_INSTALLED_MARKER}",
            private_key.trim_end()
        );
        let output = shell.run(&command).await?;
        let key = Self { path };

        if !output.stdout.contains(KEY_INSTALLED_MARKER) {
            let stderr = output.stderr.trim().to_string();
            let path = key.path.clone();
            if let Err(e) = key.remove(shell).await {
                warn!(error = %e, path = %path, "Failed to remove partial private key");
            }
            return Err(ClusterError::KeyInstall { path, stderr });
        }

        debug!(path = %key.path, "Installed private key on controller");
        Ok(key)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Delete the key file.
    pub async fn remove(self, shell: &dyn RemoteShell) -> Result<(), ClusterError> {
        shell.run(&format!("rm -f {}", self.path)).await?;
        debug!(path = %self.path, "Removed private key from controller");
        Ok(())
    }
}

/// Commands run against the namenode host.
#[derive(Debug, Clone)]
struct WorkerQueries {
    ssh_prefix: String,
    hadoop_user: String,
}

impl WorkerQueries {
    fn new(key: &RemoteKeyFile, node_info: &NodeInfo, variant: &PluginVariant) -> Self {
        Self {
            ssh_prefix: format!(
                "ssh -i {} -l {} -oUserKnownHostsFile=/dev/null -oStrictHostKeyChecking=no {}",
                key.path(),
                variant.node_username(),
                node_info.namenode_ip
            ),
            hadoop_user: variant.hadoop_user().to_string(),
        }
    }

    fn active_trackers(&self) -> String {
        format!(
            "{} sudo -u {} -i \"hadoop job -list-active-trackers | wc -l\"",
            self.ssh_prefix, self.hadoop_user
        )
    }

    fn live_datanodes(&self) -> String {
        format!(
            "{} sudo -u {} -i \"hadoop dfsadmin -report\" | grep \"Datanodes available:.*\" | awk '{{print $3}}'",
            self.ssh_prefix, self.hadoop_user
        )
    }
}

/// Parse a count printed on its own line.
pub fn parse_count(stdout: &str) -> Option<u32> {
    stdout.trim().parse().ok()
}

/// Wait until the namenode reports every expected tracker and datanode.
///
/// The key file is installed once before polling and removed afterwards,
/// whether the workers converged or not.
pub async fn await_workers_active(
    shell: &dyn RemoteShell,
    node_info: &NodeInfo,
    variant: &PluginVariant,
    private_key: &str,
    budget: TickBudget,
) -> Result<(), ClusterError> {
    let key = RemoteKeyFile::install(shell, private_key).await?;
    let result = poll_workers(shell, &key, node_info, variant, budget).await;
    let cleanup = key.remove(shell).await;

    match (result, cleanup) {
        (Ok(()), cleanup) => cleanup,
        (Err(e), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "Failed to remove private key from controller");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}

async fn poll_workers(
    shell: &dyn RemoteShell,
    key: &RemoteKeyFile,
    node_info: &NodeInfo,
    variant: &PluginVariant,
    budget: TickBudget,
) -> Result<(), ClusterError> {
    let queries = WorkerQueries::new(key, node_info, variant);
    let mut attempt = budget.start();
    let mut active_trackers = None;
    let mut active_datanodes = None;

    while attempt.next_tick().await {
        let trackers = shell.run(&queries.active_trackers()).await?;
        active_trackers = parse_count(&trackers.stdout);
        let datanodes = shell.run(&queries.live_datanodes()).await?;
        active_datanodes = parse_count(&datanodes.stdout);

        if active_trackers.is_none() || active_datanodes.is_none() {
            warn!(
                trackers_stdout = %trackers.stdout.trim(),
                datanodes_stdout = %datanodes.stdout.trim(),
                "Could not parse worker counts"
            );
        }

        debug!(
            attempt = attempt.ticks(),
            active_trackers = ?active_trackers,
            active_datanodes = ?active_datanodes,
            expected_trackers = node_info.tasktracker_count,
            expected_datanodes = node_info.datanode_count,
            "Worker counts"
        );

        if active_trackers == Some(node_info.tasktracker_count)
            && active_datanodes == Some(node_info.datanode_count)
        {
            info!(
                namenode_ip = %node_info.namenode_ip,
                attempts = attempt.ticks(),
                "All workers are active"
            );
            return Ok(());
        }
    }

    Err(ClusterError::WorkerConvergenceTimeout {
        expected_trackers: node_info.tasktracker_count,
        expected_datanodes: node_info.datanode_count,
        active_trackers,
        active_datanodes,
        attempts: attempt.ticks(),
        elapsed: attempt.elapsed(),
    })
}
