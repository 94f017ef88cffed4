//! Cluster provisioning errors.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while provisioning a cluster or waiting for it to converge.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The orchestration service reported the cluster in Error state.
    #[error("cluster {cluster_id} state == 'Error' after {ticks} ticks ({elapsed:?}): {payload}")]
    ClusterFailed {
        cluster_id: String,
        ticks: u32,
        elapsed: Duration,
        payload: String,
    },

    /// The cluster did not reach Active within the creation timeout.
    #[error(
        "cluster {cluster_id} state != 'Active', passed {timeout_minutes} minutes \
         (last status {last_status}, {ticks} ticks)"
    )]
    TimedOut {
        cluster_id: String,
        timeout_minutes: u64,
        ticks: u32,
        elapsed: Duration,
        last_status: String,
    },

    /// A required port never became reachable.
    #[error("on host {host} port {port} is not opened after {elapsed:?} ({probes} probes)")]
    PortTimeout {
        host: String,
        port: u16,
        probes: u32,
        elapsed: Duration,
    },

    /// The cluster shape does not match what the harness expects.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// The private key could not be written on the controller.
    #[error("failed to install private key at {path} on the controller: {stderr}")]
    KeyInstall { path: String, stderr: String },

    /// Worker daemons did not report active within the attempt budget.
    #[error(
        "tasktracker or datanode cannot be started within {elapsed:?}: expected \
         {expected_trackers} trackers and {expected_datanodes} datanodes, last saw \
         {} trackers and {} datanodes after {attempts} attempts",
        display_count(.active_trackers),
        display_count(.active_datanodes)
    )]
    WorkerConvergenceTimeout {
        expected_trackers: u32,
        expected_datanodes: u32,
        active_trackers: Option<u32>,
        active_datanodes: Option<u32>,
        attempts: u32,
        elapsed: Duration,
    },

    /// No entry for the plugin in the variant table.
    #[error("unknown plugin variant: {0}")]
    UnknownVariant(String),

    /// A lookup against a collaborator returned nothing.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// The remote shell could not run a command.
    #[error("remote shell: {0}")]
    Shell(#[from] ShellError),

    /// An orchestration or compute call failed.
    #[error("collaborator call failed: {0}")]
    Collaborator(#[from] anyhow::Error),
}

fn display_count(count: &Option<u32>) -> String {
    count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Violations of the expected cluster topology.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// No instance carries the namenode role.
    #[error("cluster {cluster_id} has no instance with the '{token}' process")]
    NoNamenode { cluster_id: String, token: String },

    /// More than one instance carries the namenode role.
    #[error("cluster {cluster_id} has {} instances with the '{token}' process: {}", .addresses.len(), .addresses.join(", "))]
    MultipleNamenodes {
        cluster_id: String,
        token: String,
        addresses: Vec<String>,
    },
}

/// Remote shell failures.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The local process could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command exceeded its per-call deadline.
    #[error("command on {target} did not finish within {deadline:?}")]
    Timeout { target: String, deadline: Duration },
}
